//! Unified domain error taxonomy
//!
//! Every operation in the core reports failures through [`DomainError`].
//! The five classes map one-to-one onto caller-visible failure kinds:
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | `InvalidInput` | malformed/missing parameters, no mutation attempted |
//! | `NotFound` | referenced entity does not exist |
//! | `Conflict` | duplicate location, capacity exceeded, already in state |
//! | `PreconditionFailed` | no default accounting session configured |
//! | `Internal` | unexpected storage/transaction failure, rolled back |
//!
//! Internal errors never leak detail to callers; the detail goes to the
//! log and the caller sees a generic message.

use serde_json::{Value, json};

/// Application-level domain error
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn precondition_failed(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable kind tag
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::InvalidInput(_) => "invalid_input",
            DomainError::NotFound(_) => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::PreconditionFailed(_) => "precondition_failed",
            DomainError::Internal(_) => "internal",
        }
    }

    /// Whether a per-item failure of this kind aborts an entire batch.
    ///
    /// Validation-class failures are isolated into the batch `failed[]`
    /// list; internal and precondition failures roll the batch back.
    pub fn is_fatal_for_batch(&self) -> bool {
        matches!(
            self,
            DomainError::Internal(_) | DomainError::PreconditionFailed(_)
        )
    }

    /// Caller-facing message. Internal detail is masked.
    pub fn public_message(&self) -> String {
        match self {
            DomainError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }

    /// Structured failure payload for the response envelope `data` slot
    pub fn detail(&self) -> Value {
        let detail = match self {
            DomainError::Internal(_) => Value::Null,
            DomainError::InvalidInput(m)
            | DomainError::NotFound(m)
            | DomainError::Conflict(m)
            | DomainError::PreconditionFailed(m) => Value::String(m.clone()),
        };
        json!({
            "kind": self.kind(),
            "detail": detail,
        })
    }
}
