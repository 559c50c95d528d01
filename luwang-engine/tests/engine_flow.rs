//! End-to-end scenarios against the in-memory backend

use std::sync::Arc;

use serde_json::json;

use luwang_engine::core::{EngineConfig, EngineState};
use luwang_engine::dispatch::dispatch;
use luwang_engine::ops::{assignments, plots};
use luwang_engine::store::{MemoryStore, StoreReader};
use luwang_engine::txn::OpContext;
use luwang_engine::{analytics, capacity};

use shared::DomainError;
use shared::models::{
    AssignmentCreate, AuditAction, CapacityAdjustMode, Field, Payment, PlotCreate, Worker,
};
use shared::types::{AssignmentStatus, PaymentStatus, PlotStatus};
use shared::util::{now_millis, snowflake_id};

struct Harness {
    state: Arc<EngineState>,
    store: Arc<MemoryStore>,
    ctx: OpContext,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    store.seed_field(Field {
        id: 1,
        name: "East Field".into(),
        location: Some("Riverside".into()),
    });
    store.seed_worker(Worker {
        id: 10,
        name: "A. Chen".into(),
        is_active: true,
    });
    store.seed_worker(Worker {
        id: 11,
        name: "B. Osei".into(),
        is_active: true,
    });
    let state = Arc::new(EngineState::new(
        store.clone(),
        EngineConfig::with_session(1),
    ));
    Harness {
        state,
        store,
        ctx: OpContext::new(99),
    }
}

async fn create_plot(h: &Harness, location: &str, capacity: f64) -> i64 {
    plots::create_plot(
        &h.state,
        &h.ctx,
        PlotCreate {
            field_id: 1,
            location: Some(location.into()),
            total_capacity: capacity,
            status: None,
        },
    )
    .await
    .unwrap()
    .plot
    .id
}

fn allocation(plot_id: i64, worker_id: i64, date: &str, count: f64) -> AssignmentCreate {
    AssignmentCreate {
        plot_id,
        worker_id,
        assignment_date: date.parse().unwrap(),
        capacity_count: count,
    }
}

// ── Scenario A: validate, allocate, validate again ──────────────────

#[tokio::test]
async fn scenario_a_validate_allocate_revalidate() {
    let h = harness();
    let plot_id = create_plot(&h, "A-1", 10.0).await;

    let first = capacity::validate_allocation(h.store.as_ref(), plot_id, 6.0, None)
        .await
        .unwrap();
    assert!(first.accepted);
    assert_eq!(first.remaining, 4.0);
    assert!(first.warnings.is_empty());

    assignments::create_assignment(&h.state, &h.ctx, allocation(plot_id, 10, "2026-03-01", 6.0))
        .await
        .unwrap();

    let second = capacity::validate_allocation(h.store.as_ref(), plot_id, 5.0, None)
        .await
        .unwrap();
    assert!(!second.accepted);
    assert_eq!(second.remaining, 4.0);
    assert!(
        second.recommendations[0].contains("11.00"),
        "expected a capacity-increase suggestion, got {:?}",
        second.recommendations
    );
    assert!(second.recommendations.iter().any(|r| r.contains("4.00")));
}

// ── Scenario B: sibling locations are not duplicates ────────────────

#[tokio::test]
async fn scenario_b_sibling_locations_score_low() {
    let h = harness();
    create_plot(&h, "North-1", 10.0).await;
    create_plot(&h, "North-2", 10.0).await;

    let report = h
        .state
        .detector
        .detect(h.store.as_ref(), 1, "North-1", None, None)
        .await
        .unwrap();
    // The candidate collides with the existing North-1 exactly...
    assert_eq!(report.exact_matches.len(), 1);

    // ...but excluding it (re-validating its own registration) leaves
    // only the sibling, which is neither exact nor similar.
    let report = h
        .state
        .detector
        .detect(
            h.store.as_ref(),
            1,
            "North-1",
            Some(report.exact_matches[0].plot_id),
            None,
        )
        .await
        .unwrap();
    assert!(report.exact_matches.is_empty());
    assert!(
        matches!(
            report.risk_level,
            luwang_engine::duplicate::RiskLevel::Low | luwang_engine::duplicate::RiskLevel::None
        ),
        "got {:?}",
        report.risk_level
    );
}

// ── Scenario C: completion cascade ──────────────────────────────────

#[tokio::test]
async fn scenario_c_completing_plot_cascades_assignments() {
    let h = harness();
    let plot_id = create_plot(&h, "C-1", 10.0).await;
    for (worker, count) in [(10, 2.0), (11, 3.0), (10, 1.0)] {
        assignments::create_assignment(
            &h.state,
            &h.ctx,
            allocation(plot_id, worker, "2026-03-01", count),
        )
        .await
        .unwrap();
    }

    let changed = plots::set_status(&h.state, &h.ctx, plot_id, PlotStatus::Completed)
        .await
        .unwrap();
    assert_eq!(changed.plot.status, PlotStatus::Completed);
    assert_eq!(changed.cascaded_assignment_ids.len(), 3);

    for assignment in h
        .store
        .assignments_for_plot(plot_id, None)
        .await
        .unwrap()
    {
        assert_eq!(assignment.status, AssignmentStatus::Completed);
    }

    // One audit record for the plot, cascade captured in its details
    let log = h.store.audit_log();
    let status_records: Vec<_> = log
        .iter()
        .filter(|r| r.action == AuditAction::PlotStatusChanged)
        .collect();
    assert_eq!(status_records.len(), 1);
    let cascaded = status_records[0].details["cascaded_assignments"]
        .as_array()
        .unwrap();
    assert_eq!(cascaded.len(), 3);

    // The completed plot no longer accepts allocations
    let err = assignments::create_assignment(
        &h.state,
        &h.ctx,
        allocation(plot_id, 10, "2026-03-02", 1.0),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
}

// ── Capacity invariant ──────────────────────────────────────────────

#[tokio::test]
async fn accepted_allocations_never_exceed_budget() {
    let h = harness();
    let plot_id = create_plot(&h, "I-1", 10.0).await;

    let mut accepted = 0.0_f64;
    for count in [4.0, 4.0, 4.0, 1.5, 0.5, 0.5] {
        match assignments::create_assignment(
            &h.state,
            &h.ctx,
            allocation(plot_id, 10, "2026-03-01", count),
        )
        .await
        {
            Ok(_) => accepted += count,
            Err(DomainError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
        let consumed = h.store.consumed_capacity(plot_id, None).await.unwrap();
        assert!(consumed <= rust_decimal::Decimal::from(10));
    }
    assert!(accepted <= 10.0);
}

#[tokio::test]
async fn concurrent_allocations_serialize() {
    let h = harness();
    let plot_id = create_plot(&h, "R-1", 10.0).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let state = h.state.clone();
        let ctx = h.ctx;
        handles.push(tokio::spawn(async move {
            assignments::create_assignment(
                &state,
                &ctx,
                allocation(plot_id, 10, "2026-03-01", 6.0),
            )
            .await
        }));
    }

    let mut ok = 0;
    let mut conflict = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(DomainError::Conflict(_)) => conflict += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    // Both validated against 10.00; only one fits after serialization.
    assert_eq!(ok, 1);
    assert_eq!(conflict, 1);
    assert_eq!(
        h.store.consumed_capacity(plot_id, None).await.unwrap(),
        rust_decimal::Decimal::from(6)
    );
}

// ── Bulk policy ─────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_create_isolates_validation_failures() {
    let h = harness();
    let plot_id = create_plot(&h, "B-1", 10.0).await;

    let outcome = assignments::bulk_create_assignments(
        &h.state,
        &h.ctx,
        vec![
            allocation(plot_id, 10, "2026-03-01", 3.0),
            allocation(plot_id, 10, "2026-03-01", -1.0), // invalid amount
            allocation(plot_id, 99, "2026-03-01", 1.0),  // unknown worker
            allocation(plot_id, 11, "2026-03-02", 2.0),
        ],
    )
    .await
    .unwrap();

    assert_eq!(outcome.succeeded.len(), 2);
    assert_eq!(outcome.failed.len(), 2);
    assert_eq!(outcome.failed[0].index, 1);
    assert_eq!(outcome.failed[0].kind, "invalid_input");
    assert_eq!(outcome.failed[1].index, 2);
    assert_eq!(outcome.failed[1].kind, "not_found");

    // Siblings of failed items persisted
    assert_eq!(
        h.store
            .assignments_for_plot(plot_id, None)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn bulk_create_validates_against_running_batch_state() {
    let h = harness();
    let plot_id = create_plot(&h, "B-2", 10.0).await;

    let outcome = assignments::bulk_create_assignments(
        &h.state,
        &h.ctx,
        vec![
            allocation(plot_id, 10, "2026-03-01", 6.0),
            allocation(plot_id, 11, "2026-03-01", 6.0), // budget already gone
        ],
    )
    .await
    .unwrap();

    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].kind, "conflict");
}

// ── Lifecycle: capacity adjustment, delete, precondition ────────────

#[tokio::test]
async fn capacity_adjustments_are_explicit_and_guarded() {
    let h = harness();
    let plot_id = create_plot(&h, "ADJ-1", 10.0).await;
    assignments::create_assignment(&h.state, &h.ctx, allocation(plot_id, 10, "2026-03-01", 8.0))
        .await
        .unwrap();

    let added = plots::adjust_capacity(&h.state, &h.ctx, plot_id, CapacityAdjustMode::Add, 2.0)
        .await
        .unwrap();
    assert_eq!(added.previous_total, 10.0);
    assert!(!added.overcommitted);

    // Subtract below zero is refused
    let err = plots::adjust_capacity(
        &h.state,
        &h.ctx,
        plot_id,
        CapacityAdjustMode::Subtract,
        20.0,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    // Reducing below committed usage is allowed but surfaced
    let reduced = plots::adjust_capacity(&h.state, &h.ctx, plot_id, CapacityAdjustMode::Set, 4.0)
        .await
        .unwrap();
    assert!(reduced.overcommitted);
    assert_eq!(reduced.consumed, 8.0);
    // Two successful adjustments land in the append-only notes; the
    // refused subtract rolled back and left none.
    assert_eq!(reduced.plot.notes.len(), 2);

    // Overcommit shows up as an error-severity warning on validation
    let decision = capacity::validate_allocation(h.store.as_ref(), plot_id, 1.0, None)
        .await
        .unwrap();
    assert!(!decision.accepted);
    assert!(
        decision
            .warnings
            .iter()
            .any(|w| matches!(w.code, capacity::WarningCode::Overcommit))
    );
}

#[tokio::test]
async fn delete_refuses_dependents_unless_forced() {
    let h = harness();
    let plot_id = create_plot(&h, "D-1", 10.0).await;
    assignments::create_assignment(&h.state, &h.ctx, allocation(plot_id, 10, "2026-03-01", 2.0))
        .await
        .unwrap();
    h.store.seed_payment(Payment {
        id: snowflake_id(),
        plot_id,
        worker_id: 10,
        gross_pay: "25.00".parse().unwrap(),
        net_pay: "22.50".parse().unwrap(),
        deductions: "2.50".parse().unwrap(),
        payment_date: "2026-03-05".parse().unwrap(),
        status: PaymentStatus::Paid,
        session_id: 1,
        created_at: now_millis(),
    });

    let err = plots::delete_plot(&h.state, &h.ctx, plot_id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    let deleted = plots::delete_plot(&h.state, &h.ctx, plot_id, true)
        .await
        .unwrap();
    assert_eq!(deleted.deleted_assignments, 1);
    assert_eq!(deleted.deleted_payments, 1);
    assert!(h.store.plot(plot_id).await.unwrap().is_none());
    assert!(
        h.store
            .assignments_for_plot(plot_id, None)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn mutations_require_a_configured_session() {
    let store = Arc::new(MemoryStore::new());
    store.seed_field(Field {
        id: 1,
        name: "East Field".into(),
        location: None,
    });
    let state = EngineState::new(store, EngineConfig::default());
    let ctx = OpContext::new(1);

    let err = plots::create_plot(
        &state,
        &ctx,
        PlotCreate {
            field_id: 1,
            location: None,
            total_capacity: 10.0,
            status: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));
}

// ── Dispatch envelope ───────────────────────────────────────────────

#[tokio::test]
async fn dispatch_returns_canonical_envelope() {
    let h = harness();

    let resp = dispatch(
        &h.state,
        &h.ctx,
        "plot.create",
        json!({ "field_id": 1, "location": "E-1", "total_capacity": 10.0 }),
    )
    .await;
    assert!(resp.status, "create failed: {}", resp.message);
    let plot_id = resp.data.as_ref().unwrap()["id"].as_i64().unwrap();

    // Zero-capacity utilization guard through the public boundary
    let resp = dispatch(
        &h.state,
        &h.ctx,
        "plot.adjust_capacity",
        json!({ "plot_id": plot_id, "mode": "set", "amount": 0.0 }),
    )
    .await;
    assert!(resp.status, "adjust failed: {}", resp.message);

    let resp = dispatch(
        &h.state,
        &h.ctx,
        "report.utilization",
        json!({ "plot_id": plot_id }),
    )
    .await;
    assert!(resp.status);
    let report = resp.data.unwrap();
    assert_eq!(report["utilization_rate"], 0.0);
    assert_eq!(report["total_capacity"], 0.0);

    // Failures carry kind + detail in data, message for humans
    let resp = dispatch(&h.state, &h.ctx, "plot.delete", json!({ "plot_id": 404 })).await;
    assert!(!resp.status);
    assert_eq!(resp.data.as_ref().unwrap()["kind"], "not_found");

    let resp = dispatch(&h.state, &h.ctx, "no.such_method", json!({})).await;
    assert!(!resp.status);
    assert_eq!(resp.data.as_ref().unwrap()["kind"], "invalid_input");

    // Unknown patch fields are rejected by the allow-list
    let resp = dispatch(
        &h.state,
        &h.ctx,
        "plot.update",
        json!({ "plot_id": plot_id, "patch": { "total_capacity": 99.0 } }),
    )
    .await;
    assert!(!resp.status);
    assert_eq!(resp.data.as_ref().unwrap()["kind"], "invalid_input");
}

// ── Analytics over seeded history ───────────────────────────────────

#[tokio::test]
async fn plot_report_aggregates_completed_history() {
    let h = harness();
    let plot_id = create_plot(&h, "AN-1", 50.0).await;

    // Three days of work, completed as it lands
    for (worker, date, count) in [
        (10, "2026-03-02", 4.0),
        (11, "2026-03-02", 1.0),
        (10, "2026-03-03", 6.0),
        (10, "2026-03-04", 2.0),
    ] {
        let created = assignments::create_assignment(
            &h.state,
            &h.ctx,
            allocation(plot_id, worker, date, count),
        )
        .await
        .unwrap();
        assignments::complete_assignment(&h.state, &h.ctx, created.assignment.id)
            .await
            .unwrap();
    }
    // One still-active claim consumes budget but stays out of the series
    assignments::create_assignment(&h.state, &h.ctx, allocation(plot_id, 11, "2026-03-04", 3.0))
        .await
        .unwrap();

    let report = analytics::plot_report(h.store.as_ref(), plot_id, None)
        .await
        .unwrap();

    assert_eq!(report.utilization.consumed_capacity, 16.0);
    assert_eq!(report.utilization.utilization_rate, 32.0);
    assert!(!report.utilization.overcommitted);

    assert_eq!(report.daily.len(), 3);
    assert_eq!(report.daily[0].total_capacity, 5.0);
    assert_eq!(report.daily[0].unique_worker_count, 2);
    assert_eq!(report.daily[1].trend, analytics::Trend::Up); // 5 -> 6
    assert_eq!(report.daily[2].trend, analytics::Trend::Down); // 6 -> 2

    assert_eq!(report.weekly.len(), 1);
    assert_eq!(report.weekly[0].total_capacity, 13.0);
    assert_eq!(report.monthly.len(), 1);
    assert_eq!(report.monthly[0].month, "2026-03");

    let peak = report.peak_day.unwrap();
    assert_eq!(peak.date, "2026-03-03".parse().unwrap());
    assert_eq!(peak.total_capacity, 6.0);

    let productivity = analytics::worker_productivity(h.store.as_ref(), plot_id, None)
        .await
        .unwrap();
    assert_eq!(productivity.len(), 2);
    assert_eq!(productivity[0].worker_id, 10);
    assert_eq!(productivity[0].rank, 1);
    assert_eq!(productivity[0].total_capacity, 12.0);
    assert_eq!(productivity[0].completion_rate, 1.0);
    // Worker 11: one completed, one active
    assert_eq!(productivity[1].assignment_count, 2);
    assert_eq!(productivity[1].completion_rate, 0.5);

    let comparison = analytics::field_comparison(h.store.as_ref(), 1, None)
        .await
        .unwrap();
    assert_eq!(comparison.plot_count, 1);
    assert_eq!(comparison.plots[0].rank, 1);
    assert_eq!(comparison.total_consumed, 16.0);

    // The ledger view counts active claims too, unlike the series
    let view = dispatch(
        &h.state,
        &h.ctx,
        "capacity.consumed",
        json!({ "plot_id": plot_id }),
    )
    .await;
    assert!(view.status);
    let data = view.data.unwrap();
    assert_eq!(data["consumed"], 16.0);
    assert_eq!(data["by_worker"][0]["worker_id"], 10);
    assert_eq!(data["by_worker"][0]["total_capacity"], 12.0);
    assert_eq!(data["by_day"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn reports_degrade_to_zero_shapes_without_data() {
    let h = harness();
    let plot_id = create_plot(&h, "EMPTY-1", 10.0).await;

    let report = analytics::plot_report(h.store.as_ref(), plot_id, None)
        .await
        .unwrap();
    assert_eq!(report.utilization.consumed_capacity, 0.0);
    assert_eq!(report.utilization.utilization_rate, 0.0);
    assert!(report.daily.is_empty());
    assert!(report.weekly.is_empty());
    assert!(report.monthly.is_empty());
    assert!(report.peak_day.is_none());
    assert!(report.best_weekday.is_none());

    let productivity = analytics::worker_productivity(h.store.as_ref(), plot_id, None)
        .await
        .unwrap();
    assert!(productivity.is_empty());

    let recs =
        analytics::capacity_recommendations(h.store.as_ref(), plot_id, Some("2026-03-31".parse().unwrap()))
            .await
            .unwrap();
    assert_eq!(recs.average_daily_demand, 0.0);
    assert_eq!(
        recs.recommendations[0].kind,
        analytics::RecommendationKind::Underutilized
    );
}

#[tokio::test]
async fn recommendations_flag_shortage_against_observed_demand() {
    let h = harness();
    let plot_id = create_plot(&h, "REC-1", 100.0).await;

    // 2.0 once: low utilization on a big budget -> underutilized + excess
    assignments::create_assignment(&h.state, &h.ctx, allocation(plot_id, 10, "2026-03-10", 2.0))
        .await
        .unwrap();
    let report = analytics::capacity_recommendations(
        h.store.as_ref(),
        plot_id,
        Some("2026-03-31".parse().unwrap()),
    )
    .await
    .unwrap();
    let kinds: Vec<analytics::RecommendationKind> =
        report.recommendations.iter().map(|r| r.kind).collect();
    assert!(kinds.contains(&analytics::RecommendationKind::Underutilized));
    assert!(kinds.contains(&analytics::RecommendationKind::CapacityExcess));

    // A small plot worked hard every day -> overutilized + shortage
    let busy_id = create_plot(&h, "REC-2", 30.0).await;
    for day in 1..=30 {
        assignments::create_assignment(
            &h.state,
            &h.ctx,
            allocation(busy_id, 10, &format!("2026-03-{day:02}"), 1.0),
        )
        .await
        .unwrap();
    }
    let report = analytics::capacity_recommendations(
        h.store.as_ref(),
        busy_id,
        Some("2026-03-30".parse().unwrap()),
    )
    .await
    .unwrap();
    let kinds: Vec<analytics::RecommendationKind> =
        report.recommendations.iter().map(|r| r.kind).collect();
    assert!(kinds.contains(&analytics::RecommendationKind::Overutilized));
    assert_eq!(report.average_daily_demand, 1.0);
    // buffer = 1.2; capacity 30 > 1.8 -> excess
    assert!(kinds.contains(&analytics::RecommendationKind::CapacityExcess));
}
