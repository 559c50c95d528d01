//! Method-dispatch boundary
//!
//! The UI-facing handler layer invokes the core through method name +
//! parameter object. Every call resolves to the canonical envelope
//! `{ status, message, data, meta? }`; callers branch on `status`,
//! never on transport codes.

use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use shared::models::{AssignmentCreate, CapacityAdjustMode, PlotCreate, PlotPatch};
use shared::types::PlotStatus;
use shared::{DomainError, DomainResult, OpResponse};

use crate::analytics;
use crate::capacity;
use crate::core::EngineState;
use crate::ledger;
use crate::ops::plots::PlotPatchItem;
use crate::ops::{assignments, plots};
use crate::store::DateRange;
use crate::txn::OpContext;

fn parse_params<T: DeserializeOwned>(params: Value) -> DomainResult<T> {
    serde_json::from_value(params)
        .map_err(|e| DomainError::invalid_input(format!("invalid parameters: {e}")))
}

fn respond<T: serde::Serialize>(result: DomainResult<T>, message: &str) -> OpResponse {
    match result {
        Ok(data) => OpResponse::ok_with_message(data, message),
        Err(err) => OpResponse::failure(&err),
    }
}

// ── Request parameter objects ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PlotUpdateParams {
    plot_id: i64,
    patch: PlotPatch,
}

#[derive(Debug, Deserialize)]
struct AdjustCapacityParams {
    plot_id: i64,
    mode: CapacityAdjustMode,
    amount: f64,
}

#[derive(Debug, Deserialize)]
struct SetStatusParams {
    plot_id: i64,
    status: PlotStatus,
}

#[derive(Debug, Deserialize)]
struct DeletePlotParams {
    plot_id: i64,
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Deserialize)]
struct AssignmentIdParams {
    assignment_id: i64,
}

#[derive(Debug, Deserialize)]
struct ConsumedParams {
    plot_id: i64,
    /// Scope the consumed total to one assignment date
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct ValidateParams {
    plot_id: i64,
    requested_amount: f64,
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct DetectParams {
    field_id: i64,
    location: String,
    #[serde(default)]
    exclude_plot_id: Option<i64>,
    #[serde(default)]
    radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PlotScopeParams {
    plot_id: i64,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
}

impl PlotScopeParams {
    fn range(&self) -> Option<DateRange> {
        if self.start_date.is_none() && self.end_date.is_none() {
            None
        } else {
            Some(DateRange::new(self.start_date, self.end_date))
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecommendationParams {
    plot_id: i64,
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct FieldScopeParams {
    field_id: i64,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
}

// ── Dispatch ────────────────────────────────────────────────────────

/// Resolve one method call against the engine
pub async fn dispatch(
    state: &EngineState,
    ctx: &OpContext,
    method: &str,
    params: Value,
) -> OpResponse {
    match method {
        // ═══ Plot mutations ═══
        "plot.create" => match parse_params::<PlotCreate>(params) {
            Ok(req) => match plots::create_plot(state, ctx, req).await {
                Ok(created) => {
                    let meta = created
                        .duplicate_risk
                        .as_ref()
                        .map(|risk| json!({ "duplicate_risk": risk }));
                    let mut resp = OpResponse::ok_with_message(&created.plot, "Plot created");
                    if let Some(meta) = meta {
                        resp = resp.with_meta(meta);
                    }
                    resp
                }
                Err(err) => OpResponse::failure(&err),
            },
            Err(err) => OpResponse::failure(&err),
        },
        "plot.update" => match parse_params::<PlotUpdateParams>(params) {
            Ok(req) => respond(
                plots::update_plot(state, ctx, req.plot_id, req.patch).await,
                "Plot updated",
            ),
            Err(err) => OpResponse::failure(&err),
        },
        "plot.adjust_capacity" => match parse_params::<AdjustCapacityParams>(params) {
            Ok(req) => respond(
                plots::adjust_capacity(state, ctx, req.plot_id, req.mode, req.amount).await,
                "Capacity adjusted",
            ),
            Err(err) => OpResponse::failure(&err),
        },
        "plot.set_status" => match parse_params::<SetStatusParams>(params) {
            Ok(req) => respond(
                plots::set_status(state, ctx, req.plot_id, req.status).await,
                "Plot status changed",
            ),
            Err(err) => OpResponse::failure(&err),
        },
        "plot.delete" => match parse_params::<DeletePlotParams>(params) {
            Ok(req) => respond(
                plots::delete_plot(state, ctx, req.plot_id, req.force).await,
                "Plot deleted",
            ),
            Err(err) => OpResponse::failure(&err),
        },
        "plot.bulk_create" => match parse_params::<Vec<PlotCreate>>(params) {
            Ok(items) => match plots::bulk_create_plots(state, ctx, items).await {
                Ok(outcome) => {
                    let meta = json!({
                        "created": outcome.succeeded.len(),
                        "failed": outcome.failed.len(),
                    });
                    OpResponse::ok_with_message(&outcome, "Bulk create finished").with_meta(meta)
                }
                Err(err) => OpResponse::failure(&err),
            },
            Err(err) => OpResponse::failure(&err),
        },
        "plot.bulk_update" => match parse_params::<Vec<PlotPatchItem>>(params) {
            Ok(items) => match plots::bulk_update_plots(state, ctx, items).await {
                Ok(outcome) => {
                    let meta = json!({
                        "updated": outcome.succeeded.len(),
                        "failed": outcome.failed.len(),
                    });
                    OpResponse::ok_with_message(&outcome, "Bulk update finished").with_meta(meta)
                }
                Err(err) => OpResponse::failure(&err),
            },
            Err(err) => OpResponse::failure(&err),
        },

        // ═══ Assignment mutations ═══
        "assignment.create" => match parse_params::<AssignmentCreate>(params) {
            Ok(req) => respond(
                assignments::create_assignment(state, ctx, req).await,
                "Assignment created",
            ),
            Err(err) => OpResponse::failure(&err),
        },
        "assignment.bulk_create" => match parse_params::<Vec<AssignmentCreate>>(params) {
            Ok(items) => match assignments::bulk_create_assignments(state, ctx, items).await {
                Ok(outcome) => {
                    let meta = json!({
                        "created": outcome.succeeded.len(),
                        "failed": outcome.failed.len(),
                    });
                    OpResponse::ok_with_message(&outcome, "Bulk create finished").with_meta(meta)
                }
                Err(err) => OpResponse::failure(&err),
            },
            Err(err) => OpResponse::failure(&err),
        },
        "assignment.complete" => match parse_params::<AssignmentIdParams>(params) {
            Ok(req) => respond(
                assignments::complete_assignment(state, ctx, req.assignment_id).await,
                "Assignment completed",
            ),
            Err(err) => OpResponse::failure(&err),
        },
        "assignment.cancel" => match parse_params::<AssignmentIdParams>(params) {
            Ok(req) => respond(
                assignments::cancel_assignment(state, ctx, req.assignment_id).await,
                "Assignment cancelled",
            ),
            Err(err) => OpResponse::failure(&err),
        },

        // ═══ Read side ═══
        "capacity.consumed" => match parse_params::<ConsumedParams>(params) {
            Ok(req) => {
                let range = if req.start_date.is_none() && req.end_date.is_none() {
                    None
                } else {
                    Some(DateRange::new(req.start_date, req.end_date))
                };
                respond(
                    ledger::ledger_view(
                        state.store.as_ref(),
                        req.plot_id,
                        req.date,
                        range.as_ref(),
                    )
                    .await,
                    "Ledger read",
                )
            }
            Err(err) => OpResponse::failure(&err),
        },
        "capacity.validate" => match parse_params::<ValidateParams>(params) {
            Ok(req) => respond(
                capacity::validate_allocation(
                    state.store.as_ref(),
                    req.plot_id,
                    req.requested_amount,
                    req.date,
                )
                .await,
                "Validation finished",
            ),
            Err(err) => OpResponse::failure(&err),
        },
        "duplicate.detect" => match parse_params::<DetectParams>(params) {
            Ok(req) => respond(
                state
                    .detector
                    .detect(
                        state.store.as_ref(),
                        req.field_id,
                        &req.location,
                        req.exclude_plot_id,
                        req.radius,
                    )
                    .await,
                "Detection finished",
            ),
            Err(err) => OpResponse::failure(&err),
        },
        "report.plot" => match parse_params::<PlotScopeParams>(params) {
            Ok(req) => respond(
                analytics::plot_report(state.store.as_ref(), req.plot_id, req.range().as_ref())
                    .await,
                "Report generated",
            ),
            Err(err) => OpResponse::failure(&err),
        },
        "report.utilization" => match parse_params::<PlotScopeParams>(params) {
            Ok(req) => respond(
                analytics::utilization(state.store.as_ref(), req.plot_id, req.range().as_ref())
                    .await,
                "Report generated",
            ),
            Err(err) => OpResponse::failure(&err),
        },
        "report.productivity" => match parse_params::<PlotScopeParams>(params) {
            Ok(req) => respond(
                analytics::worker_productivity(
                    state.store.as_ref(),
                    req.plot_id,
                    req.range().as_ref(),
                )
                .await,
                "Report generated",
            ),
            Err(err) => OpResponse::failure(&err),
        },
        "report.recommendations" => match parse_params::<RecommendationParams>(params) {
            Ok(req) => respond(
                analytics::capacity_recommendations(state.store.as_ref(), req.plot_id, req.as_of)
                    .await,
                "Report generated",
            ),
            Err(err) => OpResponse::failure(&err),
        },
        "report.field_comparison" => match parse_params::<FieldScopeParams>(params) {
            Ok(req) => {
                let range = if req.start_date.is_none() && req.end_date.is_none() {
                    None
                } else {
                    Some(DateRange::new(req.start_date, req.end_date))
                };
                respond(
                    analytics::field_comparison(state.store.as_ref(), req.field_id, range.as_ref())
                        .await,
                    "Report generated",
                )
            }
            Err(err) => OpResponse::failure(&err),
        },

        unknown => OpResponse::failure(&DomainError::invalid_input(format!(
            "unknown method: {unknown}"
        ))),
    }
}
