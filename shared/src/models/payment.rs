//! Payment read-model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::PaymentStatus;

/// Payment derived from assignment history
///
/// Consulted by analytics only; payments never mutate capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub plot_id: i64,
    pub worker_id: i64,
    pub gross_pay: Decimal,
    pub net_pay: Decimal,
    #[serde(default)]
    pub deductions: Decimal,
    pub payment_date: NaiveDate,
    pub status: PaymentStatus,
    pub session_id: i64,
    pub created_at: i64,
}
