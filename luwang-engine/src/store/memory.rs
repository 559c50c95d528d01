//! In-memory reference backend
//!
//! Committed state lives under a `parking_lot::RwLock` snapshot;
//! writers serialize on an async mutex held for the life of their
//! transaction and mutate a cloned working copy, which `commit`
//! publishes in one swap. Readers take brief read locks and therefore
//! observe committed state only: no dirty reads, and a long report
//! never blocks a writer for more than the swap.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use shared::models::{Assignment, AuditRecord, Field, Payment, Plot, Worker};

use super::{DataStore, DateRange, StoreError, StoreReader, StoreResult, Transaction};
use crate::ledger;

#[derive(Debug, Clone, Default)]
struct MemState {
    fields: HashMap<i64, Field>,
    workers: HashMap<i64, Worker>,
    plots: HashMap<i64, Plot>,
    assignments: HashMap<i64, Assignment>,
    payments: HashMap<i64, Payment>,
    audit_log: Vec<AuditRecord>,
}

impl MemState {
    fn plots_in_field(&self, field_id: i64) -> Vec<Plot> {
        let mut plots: Vec<Plot> = self
            .plots
            .values()
            .filter(|p| p.field_id == field_id)
            .cloned()
            .collect();
        plots.sort_by_key(|p| p.id);
        plots
    }

    fn assignments_for_plot(&self, plot_id: i64, range: Option<&DateRange>) -> Vec<Assignment> {
        let mut assignments: Vec<Assignment> = self
            .assignments
            .values()
            .filter(|a| a.plot_id == plot_id)
            .filter(|a| range.is_none_or(|r| r.contains(a.assignment_date)))
            .cloned()
            .collect();
        assignments.sort_by_key(|a| a.id);
        assignments
    }

    fn payments_for_plot(&self, plot_id: i64, range: Option<&DateRange>) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self
            .payments
            .values()
            .filter(|p| p.plot_id == plot_id)
            .filter(|p| range.is_none_or(|r| r.contains(p.payment_date)))
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.id);
        payments
    }

    fn consumed_capacity(&self, plot_id: i64, on: Option<NaiveDate>) -> Decimal {
        ledger::fold_consumed(
            self.assignments.values().filter(|a| a.plot_id == plot_id),
            on,
        )
    }

    /// Unique-location constraint: case-sensitive exact match per field
    fn check_location_unique(&self, plot: &Plot) -> StoreResult<()> {
        let Some(location) = plot.location.as_deref() else {
            return Ok(());
        };
        for existing in self.plots.values() {
            if existing.id != plot.id
                && existing.field_id == plot.field_id
                && existing.location.as_deref() == Some(location)
            {
                return Err(StoreError::Conflict(format!(
                    "location '{}' already used by plot {} in field {}",
                    location, existing.id, plot.field_id
                )));
            }
        }
        Ok(())
    }
}

/// In-memory store (reference backend and test double)
pub struct MemoryStore {
    committed: Arc<RwLock<MemState>>,
    writer: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            committed: Arc::new(RwLock::new(MemState::default())),
            writer: Arc::new(Mutex::new(())),
        }
    }

    // Fields, workers and payments are owned by external collaborators;
    // the engine only reads them. Seed helpers give fixtures and the
    // embedding layer a way in.

    pub fn seed_field(&self, field: Field) {
        self.committed.write().fields.insert(field.id, field);
    }

    pub fn seed_worker(&self, worker: Worker) {
        self.committed.write().workers.insert(worker.id, worker);
    }

    pub fn seed_payment(&self, payment: Payment) {
        self.committed.write().payments.insert(payment.id, payment);
    }

    /// Snapshot of the audit trail, append order preserved
    pub fn audit_log(&self) -> Vec<AuditRecord> {
        self.committed.read().audit_log.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreReader for MemoryStore {
    async fn field(&self, id: i64) -> StoreResult<Option<Field>> {
        Ok(self.committed.read().fields.get(&id).cloned())
    }

    async fn worker(&self, id: i64) -> StoreResult<Option<Worker>> {
        Ok(self.committed.read().workers.get(&id).cloned())
    }

    async fn plot(&self, id: i64) -> StoreResult<Option<Plot>> {
        Ok(self.committed.read().plots.get(&id).cloned())
    }

    async fn plots_in_field(&self, field_id: i64) -> StoreResult<Vec<Plot>> {
        Ok(self.committed.read().plots_in_field(field_id))
    }

    async fn assignment(&self, id: i64) -> StoreResult<Option<Assignment>> {
        Ok(self.committed.read().assignments.get(&id).cloned())
    }

    async fn assignments_for_plot(
        &self,
        plot_id: i64,
        range: Option<&DateRange>,
    ) -> StoreResult<Vec<Assignment>> {
        Ok(self.committed.read().assignments_for_plot(plot_id, range))
    }

    async fn payments_for_plot(
        &self,
        plot_id: i64,
        range: Option<&DateRange>,
    ) -> StoreResult<Vec<Payment>> {
        Ok(self.committed.read().payments_for_plot(plot_id, range))
    }

    async fn consumed_capacity(
        &self,
        plot_id: i64,
        on: Option<NaiveDate>,
    ) -> StoreResult<Decimal> {
        Ok(self.committed.read().consumed_capacity(plot_id, on))
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        // Serialize writers for the life of the transaction, then work
        // on a cloned snapshot of committed state.
        let guard = self.writer.clone().lock_owned().await;
        let working = self.committed.read().clone();
        Ok(Box::new(MemoryTxn {
            committed: self.committed.clone(),
            working,
            _writer_guard: guard,
        }))
    }
}

/// One open unit of work against a [`MemoryStore`]
///
/// Dropping the transaction without committing discards the working
/// copy and releases the writer lock; rollback is the default path.
struct MemoryTxn {
    committed: Arc<RwLock<MemState>>,
    working: MemState,
    _writer_guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl StoreReader for MemoryTxn {
    async fn field(&self, id: i64) -> StoreResult<Option<Field>> {
        Ok(self.working.fields.get(&id).cloned())
    }

    async fn worker(&self, id: i64) -> StoreResult<Option<Worker>> {
        Ok(self.working.workers.get(&id).cloned())
    }

    async fn plot(&self, id: i64) -> StoreResult<Option<Plot>> {
        Ok(self.working.plots.get(&id).cloned())
    }

    async fn plots_in_field(&self, field_id: i64) -> StoreResult<Vec<Plot>> {
        Ok(self.working.plots_in_field(field_id))
    }

    async fn assignment(&self, id: i64) -> StoreResult<Option<Assignment>> {
        Ok(self.working.assignments.get(&id).cloned())
    }

    async fn assignments_for_plot(
        &self,
        plot_id: i64,
        range: Option<&DateRange>,
    ) -> StoreResult<Vec<Assignment>> {
        Ok(self.working.assignments_for_plot(plot_id, range))
    }

    async fn payments_for_plot(
        &self,
        plot_id: i64,
        range: Option<&DateRange>,
    ) -> StoreResult<Vec<Payment>> {
        Ok(self.working.payments_for_plot(plot_id, range))
    }

    async fn consumed_capacity(
        &self,
        plot_id: i64,
        on: Option<NaiveDate>,
    ) -> StoreResult<Decimal> {
        Ok(self.working.consumed_capacity(plot_id, on))
    }
}

#[async_trait]
impl Transaction for MemoryTxn {
    async fn insert_plot(&mut self, plot: Plot) -> StoreResult<Plot> {
        self.working.check_location_unique(&plot)?;
        if self.working.plots.contains_key(&plot.id) {
            return Err(StoreError::Conflict(format!(
                "plot {} already exists",
                plot.id
            )));
        }
        self.working.plots.insert(plot.id, plot.clone());
        Ok(plot)
    }

    async fn update_plot(&mut self, plot: Plot) -> StoreResult<Plot> {
        if !self.working.plots.contains_key(&plot.id) {
            return Err(StoreError::NotFound(format!("plot {}", plot.id)));
        }
        self.working.check_location_unique(&plot)?;
        self.working.plots.insert(plot.id, plot.clone());
        Ok(plot)
    }

    async fn delete_plot(&mut self, id: i64) -> StoreResult<bool> {
        Ok(self.working.plots.remove(&id).is_some())
    }

    async fn insert_assignment(&mut self, assignment: Assignment) -> StoreResult<Assignment> {
        if !self.working.plots.contains_key(&assignment.plot_id) {
            return Err(StoreError::NotFound(format!(
                "plot {}",
                assignment.plot_id
            )));
        }
        self.working
            .assignments
            .insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn update_assignment(&mut self, assignment: Assignment) -> StoreResult<Assignment> {
        if !self.working.assignments.contains_key(&assignment.id) {
            return Err(StoreError::NotFound(format!("assignment {}", assignment.id)));
        }
        self.working
            .assignments
            .insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn delete_assignments_for_plot(&mut self, plot_id: i64) -> StoreResult<u64> {
        let before = self.working.assignments.len();
        self.working.assignments.retain(|_, a| a.plot_id != plot_id);
        Ok((before - self.working.assignments.len()) as u64)
    }

    async fn delete_payments_for_plot(&mut self, plot_id: i64) -> StoreResult<u64> {
        let before = self.working.payments.len();
        self.working.payments.retain(|_, p| p.plot_id != plot_id);
        Ok((before - self.working.payments.len()) as u64)
    }

    async fn append_audit(&mut self, record: AuditRecord) -> StoreResult<()> {
        self.working.audit_log.push(record);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTxn {
            committed,
            working,
            _writer_guard,
        } = *self;
        *committed.write() = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        // Dropping the working copy is the rollback.
        Ok(())
    }
}
