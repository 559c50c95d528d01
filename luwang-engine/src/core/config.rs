//! 引擎配置
//!
//! # 环境变量
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | DEFAULT_SESSION_ID | (未设置) | 默认记账会话 id |
//! | MAX_BULK_ITEMS | 500 | 批量操作单批条目上限 |
//!
//! 默认记账会话是显式配置值：所有变更操作启动时解析一次，
//! 未配置时以 `PreconditionFailed` 拒绝，绝不以 0/null 哨兵散落在调用点。

use shared::{DomainError, DomainResult};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Accounting session every new record is tied to.
    /// `None` means unset: mutations fail fast with `PreconditionFailed`.
    pub default_session_id: Option<i64>,
    /// Per-batch item cap for bulk operations
    pub max_bulk_items: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_session_id: None,
            max_bulk_items: 500,
        }
    }
}

impl EngineConfig {
    /// 从环境变量加载配置，未设置时使用默认值
    pub fn from_env() -> Self {
        Self {
            default_session_id: std::env::var("DEFAULT_SESSION_ID")
                .ok()
                .and_then(|v| v.parse().ok()),
            max_bulk_items: std::env::var("MAX_BULK_ITEMS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),
        }
    }

    /// Convenience constructor for embedded use
    pub fn with_session(session_id: i64) -> Self {
        Self {
            default_session_id: Some(session_id),
            ..Self::default()
        }
    }

    /// Resolve the accounting session every mutation must run under
    pub fn require_session(&self) -> DomainResult<i64> {
        self.default_session_id.ok_or_else(|| {
            DomainError::precondition_failed("no default accounting session configured")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_session_is_a_typed_precondition_failure() {
        let config = EngineConfig::default();
        let err = config.require_session().unwrap_err();
        assert!(matches!(err, DomainError::PreconditionFailed(_)));
        assert_eq!(
            EngineConfig::with_session(7).require_session().unwrap(),
            7
        );
    }
}
