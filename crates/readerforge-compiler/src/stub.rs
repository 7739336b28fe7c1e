//! A deterministic, in-process [`AssetCompiler`] that never shells out —
//! used by tests and by `readerforge doctor`/dry-run paths that need a
//! compile result without depending on an external toolchain, mirroring
//! `readerforge-llm`'s `StubBackend`.

use readerforge_types::{AssetKind, AssetSpec};

use crate::adapter::{AssetCompiler, CompileError, CompileOutcome};

pub struct StubCompiler {
    kind: AssetKind,
}

impl StubCompiler {
    #[must_use]
    pub fn new(kind: AssetKind) -> Self {
        Self { kind }
    }
}

impl AssetCompiler for StubCompiler {
    fn kind(&self) -> AssetKind {
        self.kind
    }

    fn compile(&self, spec: &AssetSpec, _correlation_id: &str) -> Result<CompileOutcome, CompileError> {
        let svg = format!(
            r#"<svg viewBox="0 0 100 100" xmlns="http://www.w3.org/2000/svg"><text x="4" y="50">{}</text></svg>"#,
            spec.name()
        );
        Ok(CompileOutcome {
            success: true,
            svg: Some(svg),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readerforge_types::{ChemistrySpec};

    #[test]
    fn stub_always_succeeds_deterministically() {
        let compiler = StubCompiler::new(AssetKind::Chem);
        let spec = AssetSpec::Chem(ChemistrySpec {
            name: "ethanol".to_string(),
            smiles: "CCO".to_string(),
            caption: None,
            content_hash: None,
        });
        let a = compiler.compile(&spec, "corr-1").unwrap();
        let b = compiler.compile(&spec, "corr-1").unwrap();
        assert_eq!(a.svg, b.svg);
        assert!(a.success);
    }
}
