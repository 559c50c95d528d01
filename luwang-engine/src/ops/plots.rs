//! Plot mutating operations
//!
//! Creation, allow-listed updates, explicit capacity adjustment,
//! status changes with completion cascade, force-aware deletion, and
//! the bulk variants. All run inside the write coordinator.

use serde::Serialize;
use serde_json::json;

use shared::models::{AuditAction, CapacityAdjustMode, Plot, PlotCreate, PlotNote, PlotPatch};
use shared::types::{AssignmentStatus, PlotStatus};
use shared::util::{now_millis, snowflake_id};
use shared::{DomainError, DomainResult};

use crate::audit::diff;
use crate::core::EngineState;
use crate::duplicate::DuplicateReport;
use crate::ledger;
use crate::ops::{BulkFailure, BulkOutcome};
use crate::store::{StoreReader, Transaction};
use crate::txn::{OpContext, TxnHandle};
use crate::utils::decimal::{to_decimal, to_f64};
use crate::utils::validation::{
    MAX_LOCATION_LEN, MAX_NOTE_LEN, validate_non_negative, validate_optional_text,
    validate_positive,
};

const ENTITY_PLOT: &str = "plot";

/// Result of creating a plot, with the advisory duplication report
#[derive(Debug, Serialize)]
pub struct CreatedPlot {
    pub plot: Plot,
    /// Present when the plot has a location; advisory only
    pub duplicate_risk: Option<DuplicateReport>,
}

/// Result of a capacity adjustment
#[derive(Debug, Serialize)]
pub struct CapacityAdjusted {
    pub plot: Plot,
    pub previous_total: f64,
    pub consumed: f64,
    /// Committed usage now exceeds the reduced budget
    pub overcommitted: bool,
}

/// Result of a status change
#[derive(Debug, Serialize)]
pub struct StatusChanged {
    pub plot: Plot,
    /// Active assignments closed by a completion cascade
    pub cascaded_assignment_ids: Vec<i64>,
}

/// Result of deleting a plot
#[derive(Debug, Serialize)]
pub struct DeletedPlot {
    pub plot_id: i64,
    pub deleted_assignments: u64,
    pub deleted_payments: u64,
}

fn validate_create(req: &PlotCreate) -> DomainResult<()> {
    validate_non_negative(req.total_capacity, "total capacity")?;
    validate_optional_text(req.location.as_deref(), "location", MAX_LOCATION_LEN)?;
    Ok(())
}

/// Insert one new plot inside an open transaction
async fn insert_new_plot(handle: &mut TxnHandle, req: &PlotCreate) -> DomainResult<Plot> {
    validate_create(req)?;
    handle
        .txn()
        .field(req.field_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("field {}", req.field_id)))?;

    let now = now_millis();
    let plot = Plot {
        id: snowflake_id(),
        field_id: req.field_id,
        location: req.location.clone(),
        total_capacity: to_decimal(req.total_capacity),
        status: req.status.unwrap_or(PlotStatus::Active),
        session_id: handle.session_id(),
        notes: vec![],
        created_at: now,
        updated_at: now,
    };
    let plot = handle.txn_mut().insert_plot(plot).await?;
    handle
        .audit(
            AuditAction::PlotCreated,
            ENTITY_PLOT,
            plot.id,
            diff::creation_snapshot(&plot),
        )
        .await;
    Ok(plot)
}

/// Register a new plot
///
/// The returned report carries the full fuzzy-duplication advisory;
/// only a case-sensitive exact location collision rejects the write.
pub async fn create_plot(
    state: &EngineState,
    ctx: &OpContext,
    req: PlotCreate,
) -> DomainResult<CreatedPlot> {
    validate_create(&req)?;

    state
        .store
        .field(req.field_id)
        .await
        .map_err(DomainError::from)?
        .ok_or_else(|| DomainError::not_found(format!("field {}", req.field_id)))?;

    // Advisory duplication scan against committed state, before the
    // transaction opens. The store re-enforces the hard constraint.
    let duplicate_risk = match req.location.as_deref() {
        Some(location) => {
            let report = state
                .detector
                .detect(state.store.as_ref(), req.field_id, location, None, None)
                .await?;
            if let Some(existing) = report
                .exact_matches
                .iter()
                .find(|m| m.location == location)
            {
                return Err(DomainError::conflict(format!(
                    "location '{}' already used by plot {} in field {}",
                    location, existing.plot_id, req.field_id
                )));
            }
            Some(report)
        }
        None => None,
    };

    let plot = state
        .coordinator
        .execute(ctx, move |h| {
            Box::pin(async move { insert_new_plot(h, &req).await })
        })
        .await?;

    Ok(CreatedPlot {
        plot,
        duplicate_risk,
    })
}

/// Apply an allow-listed patch to a plot
pub async fn update_plot(
    state: &EngineState,
    ctx: &OpContext,
    plot_id: i64,
    patch: PlotPatch,
) -> DomainResult<Plot> {
    if patch.is_empty() {
        return Err(DomainError::invalid_input("no fields to update"));
    }
    validate_optional_text(patch.location.as_deref(), "location", MAX_LOCATION_LEN)?;
    validate_optional_text(patch.note.as_deref(), "note", MAX_NOTE_LEN)?;

    state
        .coordinator
        .execute(ctx, move |h| {
            Box::pin(async move {
                let before = h
                    .txn()
                    .plot(plot_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found(format!("plot {plot_id}")))?;

                let mut plot = before.clone();
                if let Some(location) = patch.location {
                    plot.location = Some(location);
                }
                if let Some(text) = patch.note {
                    plot.notes.push(PlotNote {
                        at: now_millis(),
                        actor_id: h.actor_id(),
                        text,
                    });
                }
                plot.updated_at = now_millis();

                let plot = h.txn_mut().update_plot(plot).await?;
                h.audit(
                    AuditAction::PlotUpdated,
                    ENTITY_PLOT,
                    plot.id,
                    diff::update_details(&before, &plot),
                )
                .await;
                Ok(plot)
            })
        })
        .await
}

/// Adjust a plot's declared capacity (`set`/`add`/`subtract`)
///
/// The budget never goes negative. Reducing it below committed usage is
/// allowed but surfaced as `overcommitted`.
pub async fn adjust_capacity(
    state: &EngineState,
    ctx: &OpContext,
    plot_id: i64,
    mode: CapacityAdjustMode,
    amount: f64,
) -> DomainResult<CapacityAdjusted> {
    match mode {
        CapacityAdjustMode::Set => validate_non_negative(amount, "capacity amount")?,
        CapacityAdjustMode::Add | CapacityAdjustMode::Subtract => {
            validate_positive(amount, "capacity amount")?
        }
    }

    state
        .coordinator
        .execute(ctx, move |h| {
            Box::pin(async move {
                let before = h
                    .txn()
                    .plot(plot_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found(format!("plot {plot_id}")))?;

                let previous = before.total_capacity;
                let delta = to_decimal(amount);
                let new_total = match mode {
                    CapacityAdjustMode::Set => delta,
                    CapacityAdjustMode::Add => previous + delta,
                    CapacityAdjustMode::Subtract => previous - delta,
                };
                if new_total < rust_decimal::Decimal::ZERO {
                    return Err(DomainError::conflict(format!(
                        "total capacity cannot become negative (current {:.2}, subtracting {:.2})",
                        to_f64(previous),
                        amount
                    )));
                }

                let consumed = ledger::consumed(h.txn(), plot_id, None).await?;
                let overcommitted = consumed > new_total;

                let mut plot = before.clone();
                plot.total_capacity = new_total;
                plot.notes.push(PlotNote {
                    at: now_millis(),
                    actor_id: h.actor_id(),
                    text: format!(
                        "capacity {} {:.2} (total {:.2} -> {:.2})",
                        mode.as_str(),
                        amount,
                        to_f64(previous),
                        to_f64(new_total)
                    ),
                });
                plot.updated_at = now_millis();

                let plot = h.txn_mut().update_plot(plot).await?;
                h.audit(
                    AuditAction::PlotCapacityAdjusted,
                    ENTITY_PLOT,
                    plot.id,
                    json!({
                        "mode": mode.as_str(),
                        "amount": amount,
                        "from": to_f64(previous),
                        "to": to_f64(plot.total_capacity),
                        "consumed": to_f64(consumed),
                        "overcommitted": overcommitted,
                    }),
                )
                .await;

                Ok(CapacityAdjusted {
                    previous_total: to_f64(previous),
                    consumed: to_f64(consumed),
                    overcommitted,
                    plot,
                })
            })
        })
        .await
}

/// Change a plot's lifecycle status
///
/// Marking a plot `completed` cascades: every active assignment
/// transitions to `completed` in the same transaction, and the cascade
/// is captured in the plot's audit record.
pub async fn set_status(
    state: &EngineState,
    ctx: &OpContext,
    plot_id: i64,
    status: PlotStatus,
) -> DomainResult<StatusChanged> {
    state
        .coordinator
        .execute(ctx, move |h| {
            Box::pin(async move {
                let before = h
                    .txn()
                    .plot(plot_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found(format!("plot {plot_id}")))?;
                if before.status == status {
                    return Err(DomainError::conflict(format!(
                        "plot {plot_id} is already {status}"
                    )));
                }

                let mut cascaded_assignment_ids = Vec::new();
                if status == PlotStatus::Completed {
                    let assignments = h.txn().assignments_for_plot(plot_id, None).await?;
                    for assignment in assignments {
                        if assignment.status != AssignmentStatus::Active {
                            continue;
                        }
                        let mut closed = assignment;
                        closed.status = AssignmentStatus::Completed;
                        closed.updated_at = now_millis();
                        let closed = h.txn_mut().update_assignment(closed).await?;
                        cascaded_assignment_ids.push(closed.id);
                    }
                }

                let mut plot = before.clone();
                plot.status = status;
                plot.updated_at = now_millis();
                let plot = h.txn_mut().update_plot(plot).await?;

                h.audit(
                    AuditAction::PlotStatusChanged,
                    ENTITY_PLOT,
                    plot.id,
                    json!({
                        "changes": diff::field_changes(&before, &plot),
                        "cascaded_assignments": cascaded_assignment_ids,
                    }),
                )
                .await;

                Ok(StatusChanged {
                    plot,
                    cascaded_assignment_ids,
                })
            })
        })
        .await
}

/// Delete a plot
///
/// Refused while assignments or payments depend on it unless `force`
/// is set, in which case dependents are deleted first, inside the same
/// transaction.
pub async fn delete_plot(
    state: &EngineState,
    ctx: &OpContext,
    plot_id: i64,
    force: bool,
) -> DomainResult<DeletedPlot> {
    state
        .coordinator
        .execute(ctx, move |h| {
            Box::pin(async move {
                let plot = h
                    .txn()
                    .plot(plot_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found(format!("plot {plot_id}")))?;

                let assignments = h.txn().assignments_for_plot(plot_id, None).await?.len();
                let payments = h.txn().payments_for_plot(plot_id, None).await?.len();
                if (assignments + payments) > 0 && !force {
                    return Err(DomainError::conflict(format!(
                        "plot {plot_id} has {assignments} assignments and {payments} payments; pass force to delete dependents"
                    )));
                }

                let deleted_assignments = h.txn_mut().delete_assignments_for_plot(plot_id).await?;
                let deleted_payments = h.txn_mut().delete_payments_for_plot(plot_id).await?;
                h.txn_mut().delete_plot(plot_id).await?;

                let mut details = diff::deletion_snapshot(&plot);
                details["deleted_assignments"] = json!(deleted_assignments);
                details["deleted_payments"] = json!(deleted_payments);
                h.audit(AuditAction::PlotDeleted, ENTITY_PLOT, plot_id, details)
                    .await;

                Ok(DeletedPlot {
                    plot_id,
                    deleted_assignments,
                    deleted_payments,
                })
            })
        })
        .await
}

/// Create many plots in one transaction
///
/// Per-item validation failures are isolated into `failed`; a
/// store-level failure rolls back the whole batch.
pub async fn bulk_create_plots(
    state: &EngineState,
    ctx: &OpContext,
    items: Vec<PlotCreate>,
) -> DomainResult<BulkOutcome<Plot>> {
    if items.is_empty() {
        return Err(DomainError::invalid_input("items must not be empty"));
    }
    if items.len() > state.config.max_bulk_items {
        return Err(DomainError::invalid_input(format!(
            "batch of {} exceeds the limit of {}",
            items.len(),
            state.config.max_bulk_items
        )));
    }

    state
        .coordinator
        .execute(ctx, move |h| {
            Box::pin(async move {
                let mut outcome = BulkOutcome {
                    succeeded: Vec::new(),
                    failed: Vec::new(),
                };
                for (index, req) in items.iter().enumerate() {
                    match insert_new_plot(h, req).await {
                        Ok(plot) => outcome.succeeded.push(plot),
                        Err(err) if err.is_fatal_for_batch() => return Err(err),
                        Err(err) => outcome.failed.push(BulkFailure::new(index, &err)),
                    }
                }
                Ok(outcome)
            })
        })
        .await
}

/// One item of a bulk plot update
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PlotPatchItem {
    pub plot_id: i64,
    pub patch: PlotPatch,
}

/// Patch many plots in one transaction, same isolation as bulk create
pub async fn bulk_update_plots(
    state: &EngineState,
    ctx: &OpContext,
    items: Vec<PlotPatchItem>,
) -> DomainResult<BulkOutcome<Plot>> {
    if items.is_empty() {
        return Err(DomainError::invalid_input("items must not be empty"));
    }
    if items.len() > state.config.max_bulk_items {
        return Err(DomainError::invalid_input(format!(
            "batch of {} exceeds the limit of {}",
            items.len(),
            state.config.max_bulk_items
        )));
    }

    state
        .coordinator
        .execute(ctx, move |h| {
            Box::pin(async move {
                let mut outcome = BulkOutcome {
                    succeeded: Vec::new(),
                    failed: Vec::new(),
                };
                for (index, item) in items.iter().enumerate() {
                    match patch_plot_in_txn(h, item).await {
                        Ok(plot) => outcome.succeeded.push(plot),
                        Err(err) if err.is_fatal_for_batch() => return Err(err),
                        Err(err) => outcome.failed.push(BulkFailure::new(index, &err)),
                    }
                }
                Ok(outcome)
            })
        })
        .await
}

async fn patch_plot_in_txn(handle: &mut TxnHandle, item: &PlotPatchItem) -> DomainResult<Plot> {
    if item.patch.is_empty() {
        return Err(DomainError::invalid_input("no fields to update"));
    }
    validate_optional_text(item.patch.location.as_deref(), "location", MAX_LOCATION_LEN)?;
    validate_optional_text(item.patch.note.as_deref(), "note", MAX_NOTE_LEN)?;

    let before = handle
        .txn()
        .plot(item.plot_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("plot {}", item.plot_id)))?;

    let mut plot = before.clone();
    if let Some(location) = item.patch.location.clone() {
        plot.location = Some(location);
    }
    if let Some(text) = item.patch.note.clone() {
        plot.notes.push(PlotNote {
            at: now_millis(),
            actor_id: handle.actor_id(),
            text,
        });
    }
    plot.updated_at = now_millis();

    let plot = handle.txn_mut().update_plot(plot).await?;
    handle
        .audit(
            AuditAction::PlotUpdated,
            ENTITY_PLOT,
            plot.id,
            diff::update_details(&before, &plot),
        )
        .await;
    Ok(plot)
}
