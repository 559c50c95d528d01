//! Worker read-model

use serde::{Deserialize, Serialize};

/// External worker entity, referenced by id/name only within this core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}
