//! 事务写入协调器
//!
//! 所有变更操作统一经过 [`WriteCoordinator::execute`]：
//!
//! 1. 解析默认记账会话（未配置 → `PreconditionFailed`，事务不开启）
//! 2. 开启事务，执行操作闭包
//! 3. 成功 → 提交；失败或 panic → 回滚（丢弃句柄即回滚，
//!    事务资源在任何退出路径上都会释放）
//!
//! 审计记录通过 [`TxnHandle::audit`] 在同一事务内追加；
//! 审计写入失败只记日志，不影响外层变更。

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use shared::models::{AuditAction, AuditRecord};
use shared::util::{now_millis, snowflake_id};
use shared::{DomainError, DomainResult};

use crate::core::EngineConfig;
use crate::store::{DataStore, Transaction};

/// Caller identity threaded through every mutation for audit
#[derive(Debug, Clone, Copy)]
pub struct OpContext {
    pub actor_id: i64,
}

impl OpContext {
    pub fn new(actor_id: i64) -> Self {
        Self { actor_id }
    }
}

/// One open unit of work plus the audit context of the operation
pub struct TxnHandle {
    txn: Box<dyn Transaction>,
    session_id: i64,
    actor_id: i64,
}

impl TxnHandle {
    /// Read view of the transaction (includes this unit's own writes)
    pub fn txn(&self) -> &dyn Transaction {
        &*self.txn
    }

    pub fn txn_mut(&mut self) -> &mut (dyn Transaction + 'static) {
        &mut *self.txn
    }

    /// Accounting session the operation runs under
    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    pub fn actor_id(&self) -> i64 {
        self.actor_id
    }

    /// Append one audit record inside the transaction.
    ///
    /// Audit failure is logged and swallowed; it never fails the
    /// enclosing mutation.
    pub async fn audit(
        &mut self,
        action: AuditAction,
        entity_type: &str,
        entity_id: i64,
        details: Value,
    ) {
        let record = AuditRecord {
            id: snowflake_id(),
            actor_id: self.actor_id,
            action,
            entity_type: entity_type.to_string(),
            entity_id,
            details,
            timestamp: now_millis(),
        };
        if let Err(e) = self.txn.append_audit(record).await {
            tracing::error!(
                target: "audit",
                error = %e,
                action = action.as_str(),
                entity_type,
                entity_id,
                "Failed to append audit record"
            );
        }
    }
}

/// Unit-of-work wrapper around every mutating domain operation
#[derive(Clone)]
pub struct WriteCoordinator {
    store: Arc<dyn DataStore>,
    config: EngineConfig,
}

impl WriteCoordinator {
    pub fn new(store: Arc<dyn DataStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Run `op` inside one transaction.
    ///
    /// The closure signals failure by returning `Err`; any error (or an
    /// unwind through the caller dropping the future) rolls the whole
    /// transaction back: no partial writes, no orphaned audit records.
    pub async fn execute<T, F>(&self, ctx: &OpContext, op: F) -> DomainResult<T>
    where
        F: for<'a> FnOnce(&'a mut TxnHandle) -> BoxFuture<'a, DomainResult<T>>,
    {
        // 会话解析失败是致命的，必须发生在任何写入之前
        let session_id = self.config.require_session()?;

        let txn = self.store.begin().await.map_err(DomainError::from)?;
        let mut handle = TxnHandle {
            txn,
            session_id,
            actor_id: ctx.actor_id,
        };

        let result = op(&mut handle).await;
        let TxnHandle { txn, .. } = handle;

        match result {
            Ok(value) => {
                txn.commit().await.map_err(DomainError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rb) = txn.rollback().await {
                    tracing::error!(target: "txn", error = %rb, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}
