//! Mutating domain operations
//!
//! Every function here runs through the write coordinator: one
//! transaction per call, one audit record per affected entity.

pub mod assignments;
pub mod plots;

use serde::Serialize;

use shared::DomainError;

/// Outcome of a bulk operation
///
/// Bulk policy is all-or-nothing per batch with per-item validation
/// isolation: validation-class failures land in `failed` and siblings
/// proceed; a store-level failure rolls back the entire batch.
#[derive(Debug, Serialize)]
pub struct BulkOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BulkFailure>,
}

/// One isolated per-item failure inside a batch
#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
    pub index: usize,
    pub kind: String,
    pub message: String,
}

impl BulkFailure {
    pub fn new(index: usize, err: &DomainError) -> Self {
        Self {
            index,
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
