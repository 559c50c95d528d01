//! Storage abstraction
//!
//! Persistence is an external collaborator. The engine talks to it
//! through these traits:
//!
//! - [`StoreReader`] — committed reads and the aggregate the ledger
//!   builds on; also the in-transaction view
//! - [`Transaction`] — one atomic unit of work; dropping it without
//!   commit rolls back
//! - [`DataStore`] — committed reads plus the ability to begin a
//!   transaction
//!
//! The in-memory reference backend lives in [`memory`]; a relational
//! backend implements the same traits without touching call sites.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use shared::DomainError;
use shared::models::{Assignment, AuditRecord, Field, Payment, Plot, Worker};

/// Storage error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(m) => DomainError::NotFound(m),
            StoreError::Conflict(m) => DomainError::Conflict(m),
            StoreError::Backend(m) => {
                tracing::error!(target: "store", error = %m, "Storage backend failure");
                DomainError::Internal(m)
            }
        }
    }
}

/// Inclusive business-date range filter
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start
            && date < start
        {
            return false;
        }
        if let Some(end) = self.end
            && date > end
        {
            return false;
        }
        true
    }
}

/// Read-side storage contract
///
/// Committed state when obtained from a [`DataStore`]; the
/// transaction-local view when obtained from a [`Transaction`].
/// Reads never block writers.
#[async_trait]
pub trait StoreReader: Send + Sync {
    async fn field(&self, id: i64) -> StoreResult<Option<Field>>;
    async fn worker(&self, id: i64) -> StoreResult<Option<Worker>>;
    async fn plot(&self, id: i64) -> StoreResult<Option<Plot>>;
    /// Plots of one field, ascending id
    async fn plots_in_field(&self, field_id: i64) -> StoreResult<Vec<Plot>>;
    async fn assignment(&self, id: i64) -> StoreResult<Option<Assignment>>;
    /// Assignments of one plot, optionally date-filtered, ascending id
    async fn assignments_for_plot(
        &self,
        plot_id: i64,
        range: Option<&DateRange>,
    ) -> StoreResult<Vec<Assignment>>;
    /// Payments of one plot, optionally date-filtered, ascending id
    async fn payments_for_plot(
        &self,
        plot_id: i64,
        range: Option<&DateRange>,
    ) -> StoreResult<Vec<Payment>>;
    /// `SUM(capacity_count)` over active/completed assignments of the
    /// plot, optionally restricted to one assignment date.
    ///
    /// An empty result folds to zero, matching the `SUM(...) OR 0`
    /// contract of the query builder, never null arithmetic.
    async fn consumed_capacity(&self, plot_id: i64, on: Option<NaiveDate>)
    -> StoreResult<Decimal>;
}

/// One atomic unit of work
///
/// All mutations and the audit trail of one operation go through a
/// single transaction. `commit` publishes everything at once; dropping
/// the transaction without committing discards everything (guaranteed
/// release on every exit path).
#[async_trait]
pub trait Transaction: StoreReader {
    async fn insert_plot(&mut self, plot: Plot) -> StoreResult<Plot>;
    async fn update_plot(&mut self, plot: Plot) -> StoreResult<Plot>;
    async fn delete_plot(&mut self, id: i64) -> StoreResult<bool>;

    async fn insert_assignment(&mut self, assignment: Assignment) -> StoreResult<Assignment>;
    async fn update_assignment(&mut self, assignment: Assignment) -> StoreResult<Assignment>;
    async fn delete_assignments_for_plot(&mut self, plot_id: i64) -> StoreResult<u64>;
    async fn delete_payments_for_plot(&mut self, plot_id: i64) -> StoreResult<u64>;

    async fn append_audit(&mut self, record: AuditRecord) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Committed store handle
#[async_trait]
pub trait DataStore: StoreReader {
    /// Open a unit of work. Writers against the same store serialize so
    /// that validation and insert inside one transaction cannot observe
    /// stale remaining capacity.
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>>;
}
