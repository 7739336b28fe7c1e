//! Uniform LLM gateway: a single `generate` call wrapping cache lookup,
//! rate limiting, retry, and tolerant response extraction around a
//! pluggable [`GenerationBackend`].

mod extraction;
mod gateway;
mod http_backend;
mod stub_backend;
mod types;

pub use extraction::tolerant_extract;
pub use gateway::{GatewayError, LlmGateway};
pub use http_backend::HttpBackend;
pub use stub_backend::StubBackend;
pub use types::{GenerationBackend, GenerationOptions, GenerationResponse, LlmError};
