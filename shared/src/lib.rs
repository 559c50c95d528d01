//! Shared types for the LuWang plot-capacity platform
//!
//! Common types used across crates: domain models, error taxonomy,
//! the canonical operation response envelope, and id/time utilities.

pub mod error;
pub mod models;
pub mod response;
pub mod types;
pub mod util;

// Re-exports
pub use error::{DomainError, DomainResult};
pub use response::OpResponse;
pub use serde::{Deserialize, Serialize};
