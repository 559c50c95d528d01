//! 时间工具函数 — 业务日期处理
//!
//! 工单按业务日期（不含时区时间戳）记账；
//! 所有日期字符串统一为 `YYYY-MM-DD`。

use chrono::NaiveDate;
use shared::{DomainError, DomainResult};

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| DomainError::invalid_input(format!("Invalid date format: {}", date)))
}

/// 当前引擎本地日期（UTC）
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// 两个日期之间的天数（含端点）
///
/// `start > end` 时返回 0。
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    if start > end {
        return 0;
    }
    (end - start).num_days() + 1
}
