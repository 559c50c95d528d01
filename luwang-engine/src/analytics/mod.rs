//! Analytics/Reporting Engine
//!
//! Derives time-series and ranking views from assignment and payment
//! history, for a single plot or across a field. Reads committed state
//! only and loads the per-plot, per-period working set into memory
//! before aggregating; the underlying folds ([`ledger::fold_consumed`],
//! the bucket builders) are iterator-friendly so a store backend can
//! push them into SQL later.
//!
//! Every report degrades to a zero-filled shape when there is no
//! underlying data; "no data" is never an error.

pub mod buckets;
pub mod productivity;
pub mod recommend;

pub use buckets::{
    BestWeekday, DailyBucket, MonthlyBucket, PeakDay, Trend, WeeklyBucket, best_weekday,
    daily_buckets, monthly_buckets, peak_day, weekly_buckets,
};
pub use productivity::{WorkerProductivity, worker_productivity};
pub use recommend::{
    CapacityRecommendation, Priority, RecommendationKind, RecommendationReport,
    capacity_recommendations,
};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use shared::{DomainError, DomainResult};

use crate::ledger;
use crate::store::{DateRange, StoreReader};
use crate::utils::decimal::{ratio_percent, to_f64};
use crate::utils::time;

/// Utilization of one plot
#[derive(Debug, Clone, Serialize)]
pub struct UtilizationReport {
    pub plot_id: i64,
    pub total_capacity: f64,
    /// All-time consumed capacity (active + completed)
    pub consumed_capacity: f64,
    pub remaining_capacity: f64,
    /// Instantaneous `consumed / total × 100`; 0 on zero capacity
    pub utilization_rate: f64,
    /// `consumed-in-period / (total × days) × 100` when both range
    /// bounds are given
    pub period_utilization_rate: Option<f64>,
    pub days_in_period: Option<i64>,
    /// Committed usage exceeds the declared budget
    pub overcommitted: bool,
}

/// Full analytics report for one plot
#[derive(Debug, Serialize)]
pub struct PlotReport {
    pub plot_id: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub utilization: UtilizationReport,
    pub daily: Vec<DailyBucket>,
    pub weekly: Vec<WeeklyBucket>,
    pub monthly: Vec<MonthlyBucket>,
    pub peak_day: Option<PeakDay>,
    pub best_weekday: Option<BestWeekday>,
}

/// One plot inside a field comparison
#[derive(Debug, Clone, Serialize)]
pub struct PlotComparison {
    /// 1-based rank by utilization
    pub rank: usize,
    pub plot_id: i64,
    pub location: Option<String>,
    pub total_capacity: f64,
    pub consumed_capacity: f64,
    pub utilization_rate: f64,
}

/// Cross-plot comparison for one field
#[derive(Debug, Serialize)]
pub struct FieldComparison {
    pub field_id: i64,
    pub plot_count: usize,
    pub total_capacity: f64,
    pub total_consumed: f64,
    /// Mean of the per-plot utilization rates; 0 with no plots
    pub average_utilization: f64,
    pub plots: Vec<PlotComparison>,
}

/// Utilization report for one plot, optionally over a period
pub async fn utilization<R>(
    reader: &R,
    plot_id: i64,
    range: Option<&DateRange>,
) -> DomainResult<UtilizationReport>
where
    R: StoreReader + ?Sized,
{
    let plot = reader
        .plot(plot_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("plot {plot_id}")))?;

    let consumed = ledger::consumed(reader, plot_id, None).await?;
    let rate = ratio_percent(consumed, plot.total_capacity);

    let (period_rate, days) = match range {
        Some(&DateRange {
            start: Some(start),
            end: Some(end),
        }) => {
            let days = time::days_inclusive(start, end);
            let in_period = ledger::fold_consumed(
                &reader
                    .assignments_for_plot(plot_id, range)
                    .await?,
                None,
            );
            let denominator = plot.total_capacity * Decimal::from(days.max(0));
            (Some(to_f64(ratio_percent(in_period, denominator))), Some(days))
        }
        _ => (None, None),
    };

    Ok(UtilizationReport {
        plot_id,
        total_capacity: to_f64(plot.total_capacity),
        consumed_capacity: to_f64(consumed),
        remaining_capacity: to_f64(plot.total_capacity - consumed),
        utilization_rate: to_f64(rate),
        period_utilization_rate: period_rate,
        days_in_period: days,
        overcommitted: consumed > plot.total_capacity,
    })
}

/// Full per-plot report: utilization, series, peak day, best weekday
pub async fn plot_report<R>(
    reader: &R,
    plot_id: i64,
    range: Option<&DateRange>,
) -> DomainResult<PlotReport>
where
    R: StoreReader + ?Sized,
{
    let utilization = utilization(reader, plot_id, range).await?;
    let assignments = reader.assignments_for_plot(plot_id, range).await?;

    Ok(PlotReport {
        plot_id,
        start_date: range.and_then(|r| r.start),
        end_date: range.and_then(|r| r.end),
        utilization,
        daily: daily_buckets(&assignments),
        weekly: weekly_buckets(&assignments),
        monthly: monthly_buckets(&assignments),
        peak_day: peak_day(&assignments),
        best_weekday: best_weekday(&assignments),
    })
}

/// Cross-plot utilization comparison for one field
pub async fn field_comparison<R>(
    reader: &R,
    field_id: i64,
    range: Option<&DateRange>,
) -> DomainResult<FieldComparison>
where
    R: StoreReader + ?Sized,
{
    reader
        .field(field_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("field {field_id}")))?;

    let plots = reader.plots_in_field(field_id).await?;
    let mut comparisons = Vec::with_capacity(plots.len());
    let mut total_capacity = Decimal::ZERO;
    let mut total_consumed = Decimal::ZERO;
    let mut utilization_sum = Decimal::ZERO;

    for plot in &plots {
        let assignments = reader.assignments_for_plot(plot.id, range).await?;
        let consumed = ledger::fold_consumed(&assignments, None);
        let rate = ratio_percent(consumed, plot.total_capacity);
        total_capacity += plot.total_capacity;
        total_consumed += consumed;
        utilization_sum += rate;
        comparisons.push(PlotComparison {
            rank: 0,
            plot_id: plot.id,
            location: plot.location.clone(),
            total_capacity: to_f64(plot.total_capacity),
            consumed_capacity: to_f64(consumed),
            utilization_rate: to_f64(rate),
        });
    }

    comparisons.sort_by(|a, b| {
        b.utilization_rate
            .partial_cmp(&a.utilization_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.plot_id.cmp(&b.plot_id))
    });
    for (index, comparison) in comparisons.iter_mut().enumerate() {
        comparison.rank = index + 1;
    }

    let average_utilization = if plots.is_empty() {
        Decimal::ZERO
    } else {
        utilization_sum / Decimal::from(plots.len() as i64)
    };

    Ok(FieldComparison {
        field_id,
        plot_count: plots.len(),
        total_capacity: to_f64(total_capacity),
        total_consumed: to_f64(total_consumed),
        average_utilization: to_f64(average_utilization),
        plots: comparisons,
    })
}
