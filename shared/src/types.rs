//! Common types for the shared crate

use serde::{Deserialize, Serialize};

/// Timestamp type (Unix milliseconds)
pub type Timestamp = i64;

/// Plot lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotStatus {
    Active,
    Inactive,
    Completed,
}

impl PlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlotStatus::Active => "active",
            PlotStatus::Inactive => "inactive",
            PlotStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for PlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Assignment lifecycle status
///
/// Only `active` and `completed` assignments draw against a plot's
/// capacity budget; `cancelled` assignments release their claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    /// Whether this status counts toward consumed capacity
    pub fn is_consuming(&self) -> bool {
        matches!(self, AssignmentStatus::Active | AssignmentStatus::Completed)
    }

    /// Terminal states cannot transition further
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::Completed | AssignmentStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Active => "active",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
}

impl PaymentStatus {
    pub fn is_counted(&self) -> bool {
        !matches!(self, PaymentStatus::Cancelled)
    }
}
