//! Capacity Validator
//!
//! Decides accept/reject for a requested allocation against a plot's
//! remaining budget and produces advisory warnings/recommendations.
//! Validation has no side effects and reserves nothing: callers must
//! re-validate inside the same transaction that inserts the assignment,
//! otherwise a concurrent writer can consume the budget in between.

use rust_decimal::Decimal;
use serde::Serialize;

use chrono::NaiveDate;
use shared::{DomainError, DomainResult};

use crate::ledger;
use crate::store::StoreReader;
use crate::utils::decimal::{ratio_percent, to_decimal, to_f64};
use crate::utils::validation::validate_positive;

/// Utilization above this raises a near-full warning (percent)
const NEAR_FULL_PERCENT: i64 = 90;
/// Utilization above this is an overcommit (percent)
const OVERCOMMIT_PERCENT: i64 = 100;

/// Warning severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Machine-readable warning code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    NearFull,
    Overcommit,
    LargeSingleAllocation,
}

/// One advisory warning attached to a validation decision
#[derive(Debug, Clone, Serialize)]
pub struct CapacityWarning {
    pub code: WarningCode,
    pub severity: Severity,
    pub message: String,
}

/// Result of validating one requested allocation
///
/// Only `accepted` is load-bearing; warnings and recommendations are
/// advisory.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationDecision {
    pub accepted: bool,
    pub plot_id: i64,
    /// Budget left after the request when accepted; the currently
    /// available budget when rejected
    pub remaining: f64,
    /// Utilization in percent if the request were committed
    pub utilization_after: f64,
    pub warnings: Vec<CapacityWarning>,
    pub recommendations: Vec<String>,
}

/// Validate a requested allocation against a plot's remaining budget
///
/// With `on` set, consumption is scoped to that assignment date (the
/// budget acts per-day); without it the whole plot history counts.
pub async fn validate_allocation<R>(
    reader: &R,
    plot_id: i64,
    requested_amount: f64,
    on: Option<NaiveDate>,
) -> DomainResult<AllocationDecision>
where
    R: StoreReader + ?Sized,
{
    validate_positive(requested_amount, "requested amount")?;

    let plot = reader
        .plot(plot_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("plot {plot_id}")))?;

    let requested = to_decimal(requested_amount);
    let consumed = ledger::consumed(reader, plot_id, on).await?;
    let available = plot.total_capacity - consumed;
    let accepted = available >= requested;
    let remaining = if accepted {
        available - requested
    } else {
        available
    };

    let utilization_after = ratio_percent(consumed + requested, plot.total_capacity);

    let mut warnings = Vec::new();
    // Overcommit is only reachable when total_capacity was reduced below
    // committed usage; it must be surfaced, not hidden.
    if ratio_percent(consumed, plot.total_capacity) > Decimal::from(OVERCOMMIT_PERCENT) {
        warnings.push(CapacityWarning {
            code: WarningCode::Overcommit,
            severity: Severity::Error,
            message: format!(
                "plot {} is overcommitted: consumed {:.2} exceeds total capacity {:.2}",
                plot_id,
                to_f64(consumed),
                to_f64(plot.total_capacity)
            ),
        });
    }

    let mut recommendations = Vec::new();
    if accepted {
        if utilization_after > Decimal::from(NEAR_FULL_PERCENT) {
            warnings.push(CapacityWarning {
                code: WarningCode::NearFull,
                severity: Severity::Warning,
                message: format!(
                    "plot {} would be at {:.2}% of capacity",
                    plot_id,
                    to_f64(utilization_after)
                ),
            });
        }
        if plot.total_capacity > Decimal::ZERO
            && requested * Decimal::from(2) > plot.total_capacity
        {
            warnings.push(CapacityWarning {
                code: WarningCode::LargeSingleAllocation,
                severity: Severity::Warning,
                message: format!(
                    "single allocation of {:.2} exceeds half of total capacity {:.2}",
                    to_f64(requested),
                    to_f64(plot.total_capacity)
                ),
            });
        }
    } else {
        let shortfall = requested - remaining;
        recommendations.push(format!(
            "increase total capacity to {:.2} (shortfall of {:.2})",
            to_f64(consumed + requested),
            to_f64(shortfall)
        ));
        if remaining > Decimal::ZERO {
            recommendations.push(format!(
                "reduce the requested amount to the remaining {:.2}",
                to_f64(remaining)
            ));
        }
        recommendations
            .push("reassign to a different date or plot with available capacity".to_string());
    }

    Ok(AllocationDecision {
        accepted,
        plot_id,
        remaining: to_f64(remaining),
        utilization_after: to_f64(utilization_after),
        warnings,
        recommendations,
    })
}
