//! Domain models
//!
//! Serde models for the plot-capacity domain. Capacity and monetary
//! amounts are `rust_decimal::Decimal` (serialized as floats); `f64`
//! appears only in boundary DTOs.

pub mod assignment;
pub mod audit;
pub mod field;
pub mod payment;
pub mod plot;
pub mod worker;

pub use assignment::{Assignment, AssignmentCreate};
pub use audit::{AuditAction, AuditRecord};
pub use field::Field;
pub use payment::Payment;
pub use plot::{CapacityAdjustMode, Plot, PlotCreate, PlotNote, PlotPatch};
pub use worker::Worker;
