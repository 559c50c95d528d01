//! LuWang Engine — plot capacity accounting & analytics core
//!
//! The engine treats each plot's declared capacity as a budget that
//! worker assignments draw against, enforces that budget transactionally
//! across concurrent writers, detects duplicate plot registrations, and
//! derives utilization/trend/productivity analytics from the assignment
//! and payment history.
//!
//! Persistence is an external collaborator behind the traits in
//! [`store`]; the crate ships an in-memory reference backend used by the
//! test suite and embedded deployments.
//!
//! Entry points:
//! - [`core::EngineState`] — wires config, store, and coordinator
//! - [`dispatch::dispatch`] — method-name + params → response envelope
//! - [`ops`] — typed mutating operations
//! - [`analytics`], [`ledger`], [`capacity`], [`duplicate`] — read side

pub mod analytics;
pub mod audit;
pub mod capacity;
pub mod core;
pub mod dispatch;
pub mod duplicate;
pub mod ledger;
pub mod ops;
pub mod store;
pub mod txn;
pub mod utils;

pub use crate::core::{EngineConfig, EngineState};
pub use crate::txn::{OpContext, WriteCoordinator};
