//! Plot model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::PlotStatus;

/// A bounded sub-area of a field with a declared capacity budget
///
/// `total_capacity` is the budget (in LuWang units) that assignments
/// draw against. It never goes negative and is only mutated through
/// explicit adjustment operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plot {
    pub id: i64,
    pub field_id: i64,
    /// Free text; unique per field when non-null (case-sensitive exact)
    #[serde(default)]
    pub location: Option<String>,
    pub total_capacity: Decimal,
    pub status: PlotStatus,
    /// Accounting session this plot was registered under
    pub session_id: i64,
    /// Append-only log of manual adjustments
    #[serde(default)]
    pub notes: Vec<PlotNote>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One append-only note on a plot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotNote {
    pub at: i64,
    pub actor_id: i64,
    pub text: String,
}

/// Plot creation payload (capacity crosses the boundary as f64)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotCreate {
    pub field_id: i64,
    #[serde(default)]
    pub location: Option<String>,
    pub total_capacity: f64,
    #[serde(default)]
    pub status: Option<PlotStatus>,
}

/// Allow-listed plot patch
///
/// Only the fields named here can be changed through `plot.update`;
/// unknown keys are rejected at parse time. Capacity and status have
/// their own explicit operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlotPatch {
    #[serde(default)]
    pub location: Option<String>,
    /// Appended to the plot's note log, never replacing it
    #[serde(default)]
    pub note: Option<String>,
}

impl PlotPatch {
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.note.is_none()
    }
}

/// How a capacity adjustment is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityAdjustMode {
    Set,
    Add,
    Subtract,
}

impl CapacityAdjustMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapacityAdjustMode::Set => "set",
            CapacityAdjustMode::Add => "add",
            CapacityAdjustMode::Subtract => "subtract",
        }
    }
}
