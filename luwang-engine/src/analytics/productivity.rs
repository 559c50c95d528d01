//! Worker productivity scoring
//!
//! Workers rank by total capacity consumed across their assignments.
//! Payment history (gross/net totals) folds in read-only; payments
//! never mutate capacity.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use shared::DomainResult;
use shared::models::{Assignment, Payment};

use crate::store::{DateRange, StoreReader};
use crate::utils::decimal::to_f64;

/// Productivity/efficiency score of one worker on one plot
#[derive(Debug, Clone, Serialize)]
pub struct WorkerProductivity {
    /// 1-based rank by total capacity consumed
    pub rank: usize,
    pub worker_id: i64,
    pub worker_name: Option<String>,
    /// Capacity consumed by active/completed assignments
    pub total_capacity: f64,
    /// All assignments regardless of status
    pub assignment_count: usize,
    pub average_per_assignment: f64,
    pub completed_assignments: usize,
    /// `completed / total`, 0 when the worker has no assignments
    pub completion_rate: f64,
    pub gross_pay_total: f64,
    pub net_pay_total: f64,
}

#[derive(Default)]
struct WorkerAgg {
    total: Decimal,
    count: usize,
    completed: usize,
    gross: Decimal,
    net: Decimal,
}

fn fold_assignments(aggs: &mut BTreeMap<i64, WorkerAgg>, assignments: &[Assignment]) {
    for a in assignments {
        let agg = aggs.entry(a.worker_id).or_default();
        agg.count += 1;
        if a.status.is_consuming() {
            agg.total += a.capacity_count;
        }
        if a.status == shared::types::AssignmentStatus::Completed {
            agg.completed += 1;
        }
    }
}

fn fold_payments(aggs: &mut BTreeMap<i64, WorkerAgg>, payments: &[Payment]) {
    for p in payments.iter().filter(|p| p.status.is_counted()) {
        let agg = aggs.entry(p.worker_id).or_default();
        agg.gross += p.gross_pay;
        agg.net += p.net_pay;
    }
}

/// Ranked productivity scores for every worker active on a plot
///
/// Degrades to an empty list when the plot has no history in the
/// requested period.
pub async fn worker_productivity<R>(
    reader: &R,
    plot_id: i64,
    range: Option<&DateRange>,
) -> DomainResult<Vec<WorkerProductivity>>
where
    R: StoreReader + ?Sized,
{
    let assignments = reader.assignments_for_plot(plot_id, range).await?;
    let payments = reader.payments_for_plot(plot_id, range).await?;

    let mut aggs: BTreeMap<i64, WorkerAgg> = BTreeMap::new();
    fold_assignments(&mut aggs, &assignments);
    fold_payments(&mut aggs, &payments);

    let mut scores = Vec::with_capacity(aggs.len());
    for (worker_id, agg) in aggs {
        let worker_name = reader.worker(worker_id).await?.map(|w| w.name);
        let average = if agg.count == 0 {
            Decimal::ZERO
        } else {
            agg.total / Decimal::from(agg.count as i64)
        };
        let completion_rate = if agg.count == 0 {
            0.0
        } else {
            agg.completed as f64 / agg.count as f64
        };
        scores.push(WorkerProductivity {
            rank: 0,
            worker_id,
            worker_name,
            total_capacity: to_f64(agg.total),
            assignment_count: agg.count,
            average_per_assignment: to_f64(average),
            completed_assignments: agg.completed,
            completion_rate,
            gross_pay_total: to_f64(agg.gross),
            net_pay_total: to_f64(agg.net),
        });
    }

    // Heaviest consumer first, ties on ascending worker id
    scores.sort_by(|a, b| {
        b.total_capacity
            .partial_cmp(&a.total_capacity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.worker_id.cmp(&b.worker_id))
    });
    for (index, score) in scores.iter_mut().enumerate() {
        score.rank = index + 1;
    }
    Ok(scores)
}
