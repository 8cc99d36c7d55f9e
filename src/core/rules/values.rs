//! Parsing of human-friendly rule values (sizes and dates).

use crate::error::RuleError;
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};

const KB: f64 = 1024.0;

/// Parse a size such as `"10MB"`, `"1.5 GB"`, `"512kb"` or `"2048"`.
///
/// Units are binary (1 KB = 1024 bytes). A bare number is bytes.
pub fn parse_size(value: &str) -> Result<u64, RuleError> {
    let invalid = || RuleError::InvalidSize {
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let number: f64 = number.parse().map_err(|_| invalid())?;
    if number < 0.0 || !number.is_finite() {
        return Err(invalid());
    }

    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1.0,
        "K" | "KB" => KB,
        "M" | "MB" => KB * KB,
        "G" | "GB" => KB * KB * KB,
        "T" | "TB" => KB * KB * KB * KB,
        _ => return Err(invalid()),
    };

    Ok((number * multiplier).round() as u64)
}

/// Resolve a date expression to an absolute local timestamp.
///
/// Accepted forms:
/// - `today` / `yesterday` - local midnight of that day
/// - `N_days_ago`, `N_weeks_ago`, `N_months_ago` (30 days), `N_years_ago` (365 days),
///   also written with spaces (`3 days ago`) - `now` minus that span
/// - `YYYY-MM-DD` - local midnight of that date
/// - RFC 3339 timestamps
pub fn resolve_date(value: &str, now: DateTime<Local>) -> Result<DateTime<Local>, RuleError> {
    let invalid = || RuleError::InvalidDate {
        value: value.to_string(),
    };

    let normalized = value.trim().to_ascii_lowercase().replace(' ', "_");

    match normalized.as_str() {
        "now" => return Ok(now),
        "today" => return local_midnight(now.date_naive()).ok_or_else(invalid),
        "yesterday" => {
            return local_midnight(now.date_naive() - Duration::days(1)).ok_or_else(invalid)
        }
        _ => {}
    }

    if let Some(rest) = normalized.strip_suffix("_ago") {
        let (count, unit) = rest.split_once('_').ok_or_else(invalid)?;
        let count = i64::from(count.parse::<u32>().map_err(|_| invalid())?);
        let days = match unit.trim_end_matches('s') {
            "day" => count,
            "week" => count * 7,
            "month" => count * 30,
            "year" => count * 365,
            _ => return Err(invalid()),
        };
        return Duration::try_days(days)
            .and_then(|span| now.checked_sub_signed(span))
            .ok_or_else(invalid);
    }

    if let Ok(date) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
        return local_midnight(date).ok_or_else(invalid);
    }

    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|_| invalid())
}

fn local_midnight(date: NaiveDate) -> Option<DateTime<Local>> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    Local.from_local_datetime(&naive).earliest()
}
