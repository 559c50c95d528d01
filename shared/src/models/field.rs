//! Field model

use serde::{Deserialize, Serialize};

/// Top-level land holding containing one or more plots
///
/// Rename/relocate is plain CRUD handled outside the core; the engine
/// only reads fields to resolve plot ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}
