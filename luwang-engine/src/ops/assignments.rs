//! Assignment mutating operations
//!
//! Creation re-validates the allocation inside the write transaction,
//! so two concurrent allocations against one plot cannot both pass
//! validation against the same remaining budget.

use serde::Serialize;

use shared::models::{Assignment, AssignmentCreate, AuditAction};
use shared::types::{AssignmentStatus, PlotStatus};
use shared::util::{now_millis, snowflake_id};
use shared::{DomainError, DomainResult};

use crate::audit::diff;
use crate::capacity::{self, AllocationDecision};
use crate::core::EngineState;
use crate::ops::{BulkFailure, BulkOutcome};
use crate::store::{StoreReader, Transaction};
use crate::txn::{OpContext, TxnHandle};
use crate::utils::decimal::to_decimal;
use crate::utils::validation::validate_positive;

const ENTITY_ASSIGNMENT: &str = "assignment";

/// Result of creating an assignment
#[derive(Debug, Serialize)]
pub struct AssignmentCreated {
    pub assignment: Assignment,
    /// The in-transaction validation decision, warnings included
    pub decision: AllocationDecision,
}

/// Validate and insert one assignment inside an open transaction
async fn insert_new_assignment(
    handle: &mut TxnHandle,
    req: &AssignmentCreate,
) -> DomainResult<(Assignment, AllocationDecision)> {
    validate_positive(req.capacity_count, "capacity count")?;

    let worker = handle
        .txn()
        .worker(req.worker_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("worker {}", req.worker_id)))?;
    if !worker.is_active {
        return Err(DomainError::conflict(format!(
            "worker {} is inactive",
            worker.id
        )));
    }

    let plot = handle
        .txn()
        .plot(req.plot_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("plot {}", req.plot_id)))?;
    if plot.status != PlotStatus::Active {
        return Err(DomainError::conflict(format!(
            "plot {} is {}; assignments require an active plot",
            plot.id, plot.status
        )));
    }

    // Whole-plot scope: the budget invariant holds across all dates.
    let decision =
        capacity::validate_allocation(handle.txn(), req.plot_id, req.capacity_count, None).await?;
    if !decision.accepted {
        return Err(DomainError::conflict(format!(
            "capacity exceeded for plot {}: requested {:.2}, remaining {:.2}",
            req.plot_id, req.capacity_count, decision.remaining
        )));
    }

    let now = now_millis();
    let assignment = Assignment {
        id: snowflake_id(),
        plot_id: req.plot_id,
        worker_id: req.worker_id,
        assignment_date: req.assignment_date,
        capacity_count: to_decimal(req.capacity_count),
        status: AssignmentStatus::Active,
        session_id: handle.session_id(),
        created_at: now,
        updated_at: now,
    };
    let assignment = handle.txn_mut().insert_assignment(assignment).await?;
    handle
        .audit(
            AuditAction::AssignmentCreated,
            ENTITY_ASSIGNMENT,
            assignment.id,
            diff::creation_snapshot(&assignment),
        )
        .await;
    Ok((assignment, decision))
}

/// Allocate a worker against a plot's capacity
pub async fn create_assignment(
    state: &EngineState,
    ctx: &OpContext,
    req: AssignmentCreate,
) -> DomainResult<AssignmentCreated> {
    validate_positive(req.capacity_count, "capacity count")?;

    state
        .coordinator
        .execute(ctx, move |h| {
            Box::pin(async move {
                let (assignment, decision) = insert_new_assignment(h, &req).await?;
                Ok(AssignmentCreated {
                    assignment,
                    decision,
                })
            })
        })
        .await
}

async fn change_status(
    state: &EngineState,
    ctx: &OpContext,
    assignment_id: i64,
    target: AssignmentStatus,
    action: AuditAction,
) -> DomainResult<Assignment> {
    state
        .coordinator
        .execute(ctx, move |h| {
            Box::pin(async move {
                let before = h
                    .txn()
                    .assignment(assignment_id)
                    .await?
                    .ok_or_else(|| {
                        DomainError::not_found(format!("assignment {assignment_id}"))
                    })?;
                if before.status.is_terminal() {
                    return Err(DomainError::conflict(format!(
                        "assignment {assignment_id} is already {}",
                        before.status
                    )));
                }

                let mut assignment = before.clone();
                assignment.status = target;
                assignment.updated_at = now_millis();
                let assignment = h.txn_mut().update_assignment(assignment).await?;

                h.audit(
                    action,
                    ENTITY_ASSIGNMENT,
                    assignment.id,
                    diff::update_details(&before, &assignment),
                )
                .await;
                Ok(assignment)
            })
        })
        .await
}

/// Mark an assignment completed; its capacity claim stays consumed
pub async fn complete_assignment(
    state: &EngineState,
    ctx: &OpContext,
    assignment_id: i64,
) -> DomainResult<Assignment> {
    change_status(
        state,
        ctx,
        assignment_id,
        AssignmentStatus::Completed,
        AuditAction::AssignmentCompleted,
    )
    .await
}

/// Cancel an assignment, releasing its capacity claim
pub async fn cancel_assignment(
    state: &EngineState,
    ctx: &OpContext,
    assignment_id: i64,
) -> DomainResult<Assignment> {
    change_status(
        state,
        ctx,
        assignment_id,
        AssignmentStatus::Cancelled,
        AuditAction::AssignmentCancelled,
    )
    .await
}

/// Create many assignments in one transaction
///
/// Items validate in order against the running in-transaction state,
/// so a batch cannot overshoot the budget by splitting itself up.
/// Validation failures are isolated into `failed`; store-level
/// failures roll back the whole batch.
pub async fn bulk_create_assignments(
    state: &EngineState,
    ctx: &OpContext,
    items: Vec<AssignmentCreate>,
) -> DomainResult<BulkOutcome<Assignment>> {
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
                    match insert_new_assignment(h, req).await {
                        Ok((assignment, _decision)) => outcome.succeeded.push(assignment),
                        Err(err) if err.is_fatal_for_batch() => return Err(err),
                        Err(err) => outcome.failed.push(BulkFailure::new(index, &err)),
                    }
                }
                Ok(outcome)
            })
        })
        .await
}
