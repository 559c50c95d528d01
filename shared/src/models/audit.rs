//! 审计日志类型定义
//!
//! 每次成功的变更在同一事务内写入一条审计记录，
//! 包含变更前后字段快照。追加写入，不可修改。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 审计操作类型（枚举，非自由文本）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // ═══ 地块 ═══
    /// 地块创建
    PlotCreated,
    /// 地块字段更新
    PlotUpdated,
    /// 地块容量调整 (set/add/subtract)
    PlotCapacityAdjusted,
    /// 地块状态变更（completed 级联关闭工单）
    PlotStatusChanged,
    /// 地块删除（force 时级联删除依赖）
    PlotDeleted,

    // ═══ 工单 ═══
    /// 工单创建
    AssignmentCreated,
    /// 工单完成
    AssignmentCompleted,
    /// 工单取消（释放容量）
    AssignmentCancelled,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::PlotCreated => "plot_created",
            AuditAction::PlotUpdated => "plot_updated",
            AuditAction::PlotCapacityAdjusted => "plot_capacity_adjusted",
            AuditAction::PlotStatusChanged => "plot_status_changed",
            AuditAction::PlotDeleted => "plot_deleted",
            AuditAction::AssignmentCreated => "assignment_created",
            AuditAction::AssignmentCompleted => "assignment_completed",
            AuditAction::AssignmentCancelled => "assignment_cancelled",
        }
    }
}

/// One immutable audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub actor_id: i64,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: i64,
    /// Structured diff/snapshot of the mutation
    pub details: Value,
    pub timestamp: i64,
}
