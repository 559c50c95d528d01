//! 审计日志
//!
//! 每次成功的变更在其事务内写入审计记录；
//! 变更差异由 [`diff`] 模块自动计算。

pub mod diff;

pub use diff::{FieldChange, creation_snapshot, deletion_snapshot, field_changes, update_details};
