//! HTTP handlers grouped by resource.

pub mod categories;
pub mod grns;
pub mod payments;
pub mod shops;
pub mod suppliers;
pub mod system;

use crate::error::{ApiError, ApiResult};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
    pub deleted: bool,
}

impl Deleted {
    pub fn new(id: Uuid) -> Self {
        Self { id, deleted: true }
    }
}

/// Parses a date filter given as epoch milliseconds or `YYYY-MM-DD` (UTC).
///
/// For calendar dates the lower bound is the start of the day and the upper
/// bound the last millisecond of the day.
pub fn parse_date_bound(
    field: &str,
    value: Option<&str>,
    end_of_day: bool,
) -> ApiResult<Option<i64>> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    if let Ok(epoch_ms) = raw.parse::<i64>() {
        return Ok(Some(epoch_ms));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ApiError::Validation(format!(
            "{field} must be epoch milliseconds or a YYYY-MM-DD date"
        ))
    })?;
    let start = date
        .and_hms_opt(0, 0, 0)
        .map(|value| value.and_utc().timestamp_millis())
        .ok_or_else(|| ApiError::Validation(format!("{field} is out of range")))?;
    Ok(Some(if end_of_day { start + DAY_MS - 1 } else { start }))
}

/// Parses an optional enum-like query value with `parse`.
pub fn parse_choice<T>(
    field: &str,
    value: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
) -> ApiResult<Option<T>> {
    match value.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(None),
        Some(raw) => parse(raw)
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("unknown {field} `{raw}`"))),
    }
}
