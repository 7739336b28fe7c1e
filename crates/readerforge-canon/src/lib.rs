//! Canonicalization and content-hashing contract shared by every pipeline
//! stage: NFC-normalize text, collapse incidental whitespace, sort map
//! keys via JCS (RFC 8785), then hash the canonical bytes with SHA-256.
//!
//! Every stage that emits an `Envelope` computes its `content_hash` through
//! this module so that two producers handed equivalent input always agree
//! on the resulting hash, regardless of field order or incidental
//! whitespace differences upstream.

pub mod hash;
pub mod text;

pub use hash::{canonical_json_bytes, hash_canonical_json, hash_bytes};
pub use text::normalize_text;
