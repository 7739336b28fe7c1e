//! External asset-compiler adapters (spec.md §4.12): a uniform
//! `spec -> SVG` contract over the plot/diagram/chemistry back-ends, each
//! treated as an external compiler process reached through
//! [`ProcessCompiler`], with content-hash caching, a per-call timeout, SVG
//! allow-list sanitization, and a precompiled-asset-on-disk fallback.

pub mod adapter;
pub mod registry;
pub mod sanitize;
pub mod stub;

pub use adapter::{AssetCompiler, CompileError, CompileOutcome, ProcessCompiler};
pub use registry::CompilerRegistry;
pub use sanitize::{sanitize_svg, SanitizeError};
pub use stub::StubCompiler;
