//! Capacity Ledger
//!
//! Read-only view answering "how much of a plot's declared capacity is
//! already consumed", whole-plot or scoped to a single date. Pure read,
//! no side effects; missing data always folds to zero.
//!
//! The ledger is the aggregation primitive the validator and analytics
//! build on. [`fold_consumed`] is the iterator-friendly core so a store
//! backend can push the same aggregation into SQL without changing the
//! public contract.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use shared::models::Assignment;
use shared::{DomainError, DomainResult};

use crate::store::{DateRange, StoreReader};
use crate::utils::decimal::to_f64;

/// Consumption attributed to one worker
#[derive(Debug, Clone, Serialize)]
pub struct WorkerConsumption {
    pub worker_id: i64,
    pub total_capacity: f64,
    pub assignment_count: usize,
}

/// Consumption attributed to one business day
#[derive(Debug, Clone, Serialize)]
pub struct DayConsumption {
    pub date: NaiveDate,
    pub total_capacity: f64,
    pub assignment_count: usize,
}

/// Fold consumed capacity over an assignment stream
///
/// Counts `active` and `completed` assignments only; `cancelled` ones
/// release their claim. With `on` set, only assignments dated exactly
/// that day are counted.
pub fn fold_consumed<'a, I>(assignments: I, on: Option<NaiveDate>) -> Decimal
where
    I: IntoIterator<Item = &'a Assignment>,
{
    assignments
        .into_iter()
        .filter(|a| a.status.is_consuming())
        .filter(|a| on.is_none_or(|d| a.assignment_date == d))
        .map(|a| a.capacity_count)
        .sum()
}

/// Consumed capacity of a plot, whole-plot or for a single date
pub async fn consumed<R>(reader: &R, plot_id: i64, on: Option<NaiveDate>) -> DomainResult<Decimal>
where
    R: StoreReader + ?Sized,
{
    Ok(reader.consumed_capacity(plot_id, on).await?)
}

/// Per-worker consumption breakdown, heaviest consumer first
///
/// Ties break on ascending worker id for deterministic output.
pub async fn worker_breakdown<R>(
    reader: &R,
    plot_id: i64,
    range: Option<&DateRange>,
) -> DomainResult<Vec<WorkerConsumption>>
where
    R: StoreReader + ?Sized,
{
    let assignments = reader.assignments_for_plot(plot_id, range).await?;
    let mut by_worker: BTreeMap<i64, (Decimal, usize)> = BTreeMap::new();
    for a in assignments.iter().filter(|a| a.status.is_consuming()) {
        let entry = by_worker.entry(a.worker_id).or_default();
        entry.0 += a.capacity_count;
        entry.1 += 1;
    }

    let mut breakdown: Vec<WorkerConsumption> = by_worker
        .into_iter()
        .map(|(worker_id, (total, count))| WorkerConsumption {
            worker_id,
            total_capacity: to_f64(total),
            assignment_count: count,
        })
        .collect();
    breakdown.sort_by(|a, b| {
        b.total_capacity
            .partial_cmp(&a.total_capacity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.worker_id.cmp(&b.worker_id))
    });
    Ok(breakdown)
}

/// Combined ledger view for one plot
#[derive(Debug, Serialize)]
pub struct LedgerView {
    pub plot_id: i64,
    /// Consumed capacity, whole-plot or scoped to `on`
    pub consumed: f64,
    pub by_worker: Vec<WorkerConsumption>,
    pub by_day: Vec<DayConsumption>,
}

/// Consumed total plus both breakdowns in one read
pub async fn ledger_view<R>(
    reader: &R,
    plot_id: i64,
    on: Option<NaiveDate>,
    range: Option<&DateRange>,
) -> DomainResult<LedgerView>
where
    R: StoreReader + ?Sized,
{
    reader
        .plot(plot_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("plot {plot_id}")))?;

    Ok(LedgerView {
        plot_id,
        consumed: to_f64(consumed(reader, plot_id, on).await?),
        by_worker: worker_breakdown(reader, plot_id, range).await?,
        by_day: daily_breakdown(reader, plot_id, range).await?,
    })
}

/// Per-day consumption breakdown in date order
pub async fn daily_breakdown<R>(
    reader: &R,
    plot_id: i64,
    range: Option<&DateRange>,
) -> DomainResult<Vec<DayConsumption>>
where
    R: StoreReader + ?Sized,
{
    let assignments = reader.assignments_for_plot(plot_id, range).await?;
    let mut by_day: BTreeMap<NaiveDate, (Decimal, usize)> = BTreeMap::new();
    for a in assignments.iter().filter(|a| a.status.is_consuming()) {
        let entry = by_day.entry(a.assignment_date).or_default();
        entry.0 += a.capacity_count;
        entry.1 += 1;
    }

    Ok(by_day
        .into_iter()
        .map(|(date, (total, count))| DayConsumption {
            date,
            total_capacity: to_f64(total),
            assignment_count: count,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use shared::types::AssignmentStatus;
    use shared::util::now_millis;

    use super::*;

    fn assignment(id: i64, date: &str, count: &str, status: AssignmentStatus) -> Assignment {
        Assignment {
            id,
            plot_id: 1,
            worker_id: id % 2,
            assignment_date: date.parse().unwrap(),
            capacity_count: count.parse().unwrap(),
            status,
            session_id: 1,
            created_at: now_millis(),
            updated_at: now_millis(),
        }
    }

    #[test]
    fn fold_consumed_is_exact_and_filters() {
        let rows = vec![
            assignment(1, "2026-03-01", "0.10", AssignmentStatus::Active),
            assignment(2, "2026-03-01", "0.20", AssignmentStatus::Completed),
            assignment(3, "2026-03-02", "9.99", AssignmentStatus::Cancelled),
        ];

        assert_eq!(fold_consumed(&rows, None), "0.30".parse::<Decimal>().unwrap());
        assert_eq!(
            fold_consumed(&rows, Some("2026-03-02".parse().unwrap())),
            Decimal::ZERO
        );
    }

    #[test]
    fn fold_consumed_empty_is_zero() {
        assert_eq!(fold_consumed(&[], None), Decimal::ZERO);
    }
}
