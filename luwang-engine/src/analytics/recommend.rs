//! Capacity recommendations
//!
//! Two independent checks:
//! 1. Utilization thresholds — under 50% underutilized (medium), over
//!    90% overutilized (high), otherwise optimal (low).
//! 2. Buffer check — total capacity against `1.2 ×` the observed
//!    30-day average daily demand: under 80% of the buffer is a
//!    shortage, over 150% an excess.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use shared::{DomainError, DomainResult};

use crate::ledger;
use crate::store::{DateRange, StoreReader};
use crate::utils::decimal::{ratio_percent, to_f64};
use crate::utils::time;

/// Observation window for average daily demand (days)
const DEMAND_WINDOW_DAYS: i64 = 30;

/// Buffer multiplier over observed average daily demand
const BUFFER_RATIO: Decimal = Decimal::from_parts(12, 0, 0, false, 1); // 1.2
/// Below this share of the buffer, capacity is short
const SHORTAGE_RATIO: Decimal = Decimal::from_parts(8, 0, 0, false, 1); // 0.8
/// Above this share of the buffer, capacity is excessive
const EXCESS_RATIO: Decimal = Decimal::from_parts(15, 0, 0, false, 1); // 1.5

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Underutilized,
    Overutilized,
    Optimal,
    CapacityShortage,
    CapacityExcess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// One human-readable recommendation
#[derive(Debug, Clone, Serialize)]
pub struct CapacityRecommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub message: String,
}

/// Recommendation report for one plot
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationReport {
    pub plot_id: i64,
    pub utilization_rate: f64,
    /// Average daily demand over the 30-day observation window
    pub average_daily_demand: f64,
    /// `1.2 × average_daily_demand` — the recommended buffer
    pub recommended_capacity: f64,
    pub recommendations: Vec<CapacityRecommendation>,
}

/// Generate capacity recommendations for a plot
///
/// `as_of` anchors the 30-day demand window; it defaults to the
/// engine-local current date.
pub async fn capacity_recommendations<R>(
    reader: &R,
    plot_id: i64,
    as_of: Option<NaiveDate>,
) -> DomainResult<RecommendationReport>
where
    R: StoreReader + ?Sized,
{
    let plot = reader
        .plot(plot_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("plot {plot_id}")))?;

    let consumed = ledger::consumed(reader, plot_id, None).await?;
    let utilization = ratio_percent(consumed, plot.total_capacity);

    let mut recommendations = Vec::new();
    if utilization < Decimal::from(50) {
        recommendations.push(CapacityRecommendation {
            kind: RecommendationKind::Underutilized,
            priority: Priority::Medium,
            message: format!(
                "plot {} is underutilized at {:.2}%; consider consolidating assignments or reducing capacity",
                plot_id,
                to_f64(utilization)
            ),
        });
    } else if utilization > Decimal::from(90) {
        recommendations.push(CapacityRecommendation {
            kind: RecommendationKind::Overutilized,
            priority: Priority::High,
            message: format!(
                "plot {} is overutilized at {:.2}%; consider increasing capacity or redistributing load",
                plot_id,
                to_f64(utilization)
            ),
        });
    } else {
        recommendations.push(CapacityRecommendation {
            kind: RecommendationKind::Optimal,
            priority: Priority::Low,
            message: format!(
                "plot {} utilization of {:.2}% is in the optimal band",
                plot_id,
                to_f64(utilization)
            ),
        });
    }

    // Independent buffer check against observed 30-day demand
    let as_of = as_of.unwrap_or_else(time::today);
    let window = DateRange::new(Some(as_of - Duration::days(DEMAND_WINDOW_DAYS - 1)), Some(as_of));
    let assignments = reader.assignments_for_plot(plot_id, Some(&window)).await?;
    let window_demand = ledger::fold_consumed(&assignments, None);
    let average_daily_demand = window_demand / Decimal::from(DEMAND_WINDOW_DAYS);
    let buffer = average_daily_demand * BUFFER_RATIO;

    if window_demand > Decimal::ZERO {
        if plot.total_capacity < buffer * SHORTAGE_RATIO {
            recommendations.push(CapacityRecommendation {
                kind: RecommendationKind::CapacityShortage,
                priority: Priority::High,
                message: format!(
                    "total capacity {:.2} is below 80% of the recommended buffer {:.2}",
                    to_f64(plot.total_capacity),
                    to_f64(buffer)
                ),
            });
        } else if plot.total_capacity > buffer * EXCESS_RATIO {
            recommendations.push(CapacityRecommendation {
                kind: RecommendationKind::CapacityExcess,
                priority: Priority::Low,
                message: format!(
                    "total capacity {:.2} exceeds 150% of the recommended buffer {:.2}",
                    to_f64(plot.total_capacity),
                    to_f64(buffer)
                ),
            });
        }
    }

    Ok(RecommendationReport {
        plot_id,
        utilization_rate: to_f64(utilization),
        average_daily_demand: to_f64(average_daily_demand),
        recommended_capacity: to_f64(buffer),
        recommendations,
    })
}
