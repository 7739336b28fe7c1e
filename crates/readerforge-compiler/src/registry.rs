//! Looks up the right [`AssetCompiler`] by [`AssetKind`] rather than
//! hardcoding a match per call site — same capability-interface shape as
//! `readerforge-gate::GateRegistry`.

use std::collections::HashMap;

use readerforge_types::{AssetKind, AssetSpec};

use crate::adapter::{AssetCompiler, CompileError, CompileOutcome};

#[derive(Default)]
pub struct CompilerRegistry {
    compilers: HashMap<AssetKind, Box<dyn AssetCompiler>>,
}

impl CompilerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            compilers: HashMap::new(),
        }
    }

    pub fn register(&mut self, compiler: Box<dyn AssetCompiler>) {
        self.compilers.insert(compiler.kind(), compiler);
    }

    #[must_use]
    pub fn get(&self, kind: AssetKind) -> Option<&dyn AssetCompiler> {
        self.compilers.get(&kind).map(std::convert::AsRef::as_ref)
    }

    /// Compile `spec` via whichever adapter is registered for its kind.
    /// Returns `Ok(None)` rather than an error when no adapter is
    /// registered for a kind (e.g. `widget`, which spec.md §4.12 does not
    /// list among the compiled kinds) — the caller decides whether that is
    /// fatal.
    pub fn compile(
        &self,
        spec: &AssetSpec,
        correlation_id: &str,
    ) -> Result<Option<CompileOutcome>, CompileError> {
        match self.get(spec.kind()) {
            Some(compiler) => compiler.compile(spec, correlation_id).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubCompiler;
    use readerforge_types::{ChemistrySpec, WidgetSpec};

    #[test]
    fn dispatches_to_the_adapter_registered_for_the_spec_kind() {
        let mut registry = CompilerRegistry::new();
        registry.register(Box::new(StubCompiler::new(AssetKind::Chem)));
        let spec = AssetSpec::Chem(ChemistrySpec {
            name: "ethanol".to_string(),
            smiles: "CCO".to_string(),
            caption: None,
            content_hash: None,
        });
        let outcome = registry.compile(&spec, "corr-1").unwrap().unwrap();
        assert!(outcome.success);
    }

    #[test]
    fn missing_adapter_returns_none_rather_than_erroring() {
        let registry = CompilerRegistry::new();
        let spec = AssetSpec::Widget(WidgetSpec {
            name: "slider".to_string(),
            widget_type: "range".to_string(),
            config: serde_json::json!({}),
            content_hash: None,
        });
        assert!(registry.compile(&spec, "corr-1").unwrap().is_none());
    }
}
