//! 审计日志 JSON diff 计算
//!
//! 通过比较更新前后的 JSON 值，自动生成变更差异。
//! 浮点数使用容差比较避免序列化精度问题。

use serde::Serialize;
use serde_json::{Value, json};

/// 浮点数比较容差 (用于处理序列化/反序列化精度损失)
const FLOAT_EPSILON: f64 = 1e-9;

/// 审计快照中排除的字段（噪声，不进差异）
const EXCLUDE_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

/// 递归比较两个 JSON 值是否相等（浮点数使用容差比较）
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(fa), Some(fb)) => (fa - fb).abs() < FLOAT_EPSILON,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(va, vb)| values_equal(va, vb))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, va)| b.get(key).is_some_and(|vb| values_equal(va, vb)))
        }
        _ => false,
    }
}

/// 字段变更记录
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct FieldChange {
    /// 字段名
    pub field: String,
    /// 变更前的值
    pub from: Value,
    /// 变更后的值
    pub to: Value,
}

fn to_object(entity: &impl Serialize) -> serde_json::Map<String, Value> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter(|(k, _)| !EXCLUDE_FIELDS.contains(&k.as_str()))
            .collect(),
        _ => serde_json::Map::new(),
    }
}

/// 创建操作的审计详情：完整 after 快照
pub fn creation_snapshot(entity: &impl Serialize) -> Value {
    json!({ "after": Value::Object(to_object(entity)) })
}

/// 删除操作的审计详情：完整 before 快照
pub fn deletion_snapshot(entity: &impl Serialize) -> Value {
    json!({ "before": Value::Object(to_object(entity)) })
}

/// 更新操作的审计详情：逐字段 before/after 差异
pub fn field_changes(before: &impl Serialize, after: &impl Serialize) -> Vec<FieldChange> {
    let before = to_object(before);
    let after = to_object(after);

    let mut changes = Vec::new();
    for (key, after_value) in &after {
        let before_value = before.get(key).unwrap_or(&Value::Null);
        if !values_equal(before_value, after_value) {
            changes.push(FieldChange {
                field: key.clone(),
                from: before_value.clone(),
                to: after_value.clone(),
            });
        }
    }
    // 字段被移除（before 有、after 无）也记录
    for (key, before_value) in &before {
        if !after.contains_key(key) {
            changes.push(FieldChange {
                field: key.clone(),
                from: before_value.clone(),
                to: Value::Null,
            });
        }
    }
    changes
}

/// 更新操作的审计详情（JSON 形式）
pub fn update_details(before: &impl Serialize, after: &impl Serialize) -> Value {
    json!({ "changes": field_changes(before, after) })
}
