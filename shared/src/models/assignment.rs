//! Assignment model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::AssignmentStatus;

/// A worker's claim against a plot's capacity for a given date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub plot_id: i64,
    pub worker_id: i64,
    pub assignment_date: NaiveDate,
    /// Amount of the plot's budget this assignment consumes (> 0)
    pub capacity_count: Decimal,
    pub status: AssignmentStatus,
    pub session_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Assignment creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentCreate {
    pub plot_id: i64,
    pub worker_id: i64,
    pub assignment_date: NaiveDate,
    pub capacity_count: f64,
}
