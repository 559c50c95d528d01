//! Time-series bucketing and trend classification
//!
//! Completed assignments group into daily buckets by assignment date
//! (engine-local business date, not timestamp). Weekly buckets are
//! fixed windows of 7 consecutive daily buckets from the first
//! available day, not calendar weeks. Monthly buckets group by the
//! day's `YYYY-MM` prefix. Only daily buckets classify trends.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use shared::models::Assignment;
use shared::types::AssignmentStatus;

use crate::utils::decimal::to_f64;

/// Growth above this classifies a day as trending up (percent)
const TREND_UP_PERCENT: f64 = 10.0;
/// Growth below this classifies a day as trending down (percent)
const TREND_DOWN_PERCENT: f64 = -10.0;

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Day-over-day trend classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

/// One calendar day of completed-assignment activity
#[derive(Debug, Clone, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub assignment_count: usize,
    pub total_capacity: f64,
    pub unique_worker_count: usize,
    pub trend: Trend,
    /// Growth versus the previous daily bucket, percent
    pub growth_percent: f64,
}

/// Seven consecutive daily buckets
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyBucket {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assignment_count: usize,
    pub total_capacity: f64,
    pub unique_worker_count: usize,
}

/// One `YYYY-MM` month of activity
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyBucket {
    pub month: String,
    pub assignment_count: usize,
    pub total_capacity: f64,
    pub unique_worker_count: usize,
}

/// Single day with the maximum total
#[derive(Debug, Clone, Serialize)]
pub struct PeakDay {
    pub date: NaiveDate,
    pub total_capacity: f64,
}

/// Weekday (0 = Sunday) with the highest accumulated total
#[derive(Debug, Clone, Serialize)]
pub struct BestWeekday {
    pub weekday_index: u8,
    pub weekday: String,
    pub total_capacity: f64,
}

/// Per-day aggregate carrying the worker set, chronological
#[derive(Debug, Clone)]
pub(crate) struct DayAgg {
    pub date: NaiveDate,
    pub count: usize,
    pub total: Decimal,
    pub workers: HashSet<i64>,
}

pub(crate) fn day_aggregates(assignments: &[Assignment]) -> Vec<DayAgg> {
    let mut by_day: BTreeMap<NaiveDate, DayAgg> = BTreeMap::new();
    for a in assignments
        .iter()
        .filter(|a| a.status == AssignmentStatus::Completed)
    {
        let agg = by_day.entry(a.assignment_date).or_insert_with(|| DayAgg {
            date: a.assignment_date,
            count: 0,
            total: Decimal::ZERO,
            workers: HashSet::new(),
        });
        agg.count += 1;
        agg.total += a.capacity_count;
        agg.workers.insert(a.worker_id);
    }
    by_day.into_values().collect()
}

fn classify_trend(yesterday: Option<Decimal>, today: Decimal) -> (Trend, f64) {
    let growth = match yesterday {
        // First bucket has no baseline
        None => 0.0,
        // An empty previous day with activity today is full growth
        Some(y) if y == Decimal::ZERO => {
            if today > Decimal::ZERO {
                100.0
            } else {
                0.0
            }
        }
        Some(y) => to_f64((today - y) / y * Decimal::from(100)),
    };
    let trend = if growth > TREND_UP_PERCENT {
        Trend::Up
    } else if growth < TREND_DOWN_PERCENT {
        Trend::Down
    } else {
        Trend::Stable
    };
    (trend, growth)
}

/// Daily series with day-over-day trend classification
pub fn daily_buckets(assignments: &[Assignment]) -> Vec<DailyBucket> {
    let aggs = day_aggregates(assignments);
    let mut buckets = Vec::with_capacity(aggs.len());
    let mut yesterday: Option<Decimal> = None;
    for agg in aggs {
        let (trend, growth_percent) = classify_trend(yesterday, agg.total);
        yesterday = Some(agg.total);
        buckets.push(DailyBucket {
            date: agg.date,
            assignment_count: agg.count,
            total_capacity: to_f64(agg.total),
            unique_worker_count: agg.workers.len(),
            trend,
            growth_percent,
        });
    }
    buckets
}

/// Weekly series: windows of 7 consecutive daily buckets
pub fn weekly_buckets(assignments: &[Assignment]) -> Vec<WeeklyBucket> {
    let aggs = day_aggregates(assignments);
    aggs.chunks(7)
        .map(|chunk| {
            let workers: HashSet<i64> = chunk
                .iter()
                .flat_map(|d| d.workers.iter().copied())
                .collect();
            WeeklyBucket {
                start_date: chunk[0].date,
                end_date: chunk[chunk.len() - 1].date,
                assignment_count: chunk.iter().map(|d| d.count).sum(),
                total_capacity: to_f64(chunk.iter().map(|d| d.total).sum::<Decimal>()),
                unique_worker_count: workers.len(),
            }
        })
        .collect()
}

/// Monthly series grouped by `YYYY-MM`
pub fn monthly_buckets(assignments: &[Assignment]) -> Vec<MonthlyBucket> {
    let aggs = day_aggregates(assignments);
    let mut by_month: BTreeMap<String, (usize, Decimal, HashSet<i64>)> = BTreeMap::new();
    for agg in aggs {
        let month = agg.date.format("%Y-%m").to_string();
        let entry = by_month
            .entry(month)
            .or_insert_with(|| (0, Decimal::ZERO, HashSet::new()));
        entry.0 += agg.count;
        entry.1 += agg.total;
        entry.2.extend(agg.workers.iter().copied());
    }
    by_month
        .into_iter()
        .map(|(month, (count, total, workers))| MonthlyBucket {
            month,
            assignment_count: count,
            total_capacity: to_f64(total),
            unique_worker_count: workers.len(),
        })
        .collect()
}

fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_sunday() as usize
}

/// Day with the maximum single-day total, ties to first occurrence
pub fn peak_day(assignments: &[Assignment]) -> Option<PeakDay> {
    let aggs = day_aggregates(assignments);
    let mut best: Option<&DayAgg> = None;
    for agg in &aggs {
        if best.is_none_or(|b| agg.total > b.total) {
            best = Some(agg);
        }
    }
    best.map(|agg| PeakDay {
        date: agg.date,
        total_capacity: to_f64(agg.total),
    })
}

/// Weekday with the highest accumulated total, ties to first occurrence
pub fn best_weekday(assignments: &[Assignment]) -> Option<BestWeekday> {
    let aggs = day_aggregates(assignments);
    if aggs.is_empty() {
        return None;
    }
    let mut totals = [Decimal::ZERO; 7];
    for agg in &aggs {
        totals[weekday_index(agg.date)] += agg.total;
    }

    let mut best: Option<usize> = None;
    for agg in &aggs {
        let idx = weekday_index(agg.date);
        match best {
            None => best = Some(idx),
            Some(b) if totals[idx] > totals[b] => best = Some(idx),
            _ => {}
        }
    }
    best.map(|idx| BestWeekday {
        weekday_index: idx as u8,
        weekday: WEEKDAY_NAMES[idx].to_string(),
        total_capacity: to_f64(totals[idx]),
    })
}
