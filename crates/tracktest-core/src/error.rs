//! Saved-state restore errors.
//!
//! Restoring a malformed blob is a fatal integration error: a partial
//! restoration would corrupt score history, so every shape violation is
//! rejected with a typed error instead of being coerced.

use thiserror::Error;

/// Errors that can occur when restoring persisted attempt state.
#[derive(Debug, Error)]
pub enum StateError {
    /// The saved value does not have the required number of elements.
    #[error("saved state has wrong arity: expected {expected} elements, found {found}")]
    WrongArity { expected: &'static str, found: usize },

    /// A value had a different JSON type than the wire format requires.
    #[error("saved state type mismatch: expected {expected}")]
    TypeMismatch { expected: &'static str },

    /// A lifecycle flag was something other than the literals `0`/`1`.
    #[error("flag value out of range: {0}")]
    InvalidFlag(f64),

    /// The used-attempts counter was negative.
    #[error("attempt count out of range: {0}")]
    InvalidCount(i64),

    /// The stored blob is not parseable JSON.
    #[error("state blob is not valid JSON: {0}")]
    MalformedBlob(#[from] serde_json::Error),
}
