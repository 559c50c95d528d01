//! Operation response types
//!
//! Standardized response envelope for the method-dispatch boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DomainError;

/// Unified operation response envelope
///
/// Every dispatched operation resolves to this shape:
/// ```json
/// {
///     "status": true,
///     "message": "Success",
///     "data": { ... },
///     "meta": { ... }
/// }
/// ```
///
/// `status = false` always implies `data` describes the failure
/// (`{"kind": ..., "detail": ...}`), never a partial success payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct OpResponse {
    /// Success flag; callers branch on this, never on codes
    pub status: bool,
    /// Human-readable message
    pub message: String,
    /// Response payload, or failure description when `status = false`
    pub data: Option<Value>,
    /// Auxiliary payload (bulk summaries, advisory risk reports)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl OpResponse {
    /// Create a successful response
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            status: true,
            message: "Success".to_string(),
            data: Some(serde_json::to_value(data).unwrap_or(Value::Null)),
            meta: None,
        }
    }

    /// Create a successful response with custom message
    pub fn ok_with_message(data: impl Serialize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::ok(data)
        }
    }

    /// Create a failure response from a domain error
    ///
    /// Internal errors are masked here; detail stays in the log.
    pub fn failure(err: &DomainError) -> Self {
        Self {
            status: false,
            message: err.public_message(),
            data: Some(err.detail()),
            meta: None,
        }
    }

    /// Attach auxiliary metadata to the response
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}
