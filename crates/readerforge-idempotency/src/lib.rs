//! Idempotency key fingerprinting and a request de-duplication store.
//!
//! Callers generate a deterministic key from `{operation, request,
//! attachments}`, register it before starting work, and complete it when
//! the work finishes — a second registration or completion for the same
//! key is a no-op that returns the existing record.

mod key;
mod record;
mod store;

pub use key::generate_key;
pub use record::{IdempotencyRecord, RecordState};
pub use store::{IdempotencyError, IdempotencyStore};
