//! Parsing of delayed-run times and recurring expressions.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{BackendError, BackendResult};

/// How a recurring registration repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    /// Six-field cron expression (seconds first).
    Cron(String),
    /// Fixed interval between occurrences.
    Interval(Duration),
}

/// Resolve a delayed-run string to an absolute UTC instant.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD`
/// (both UTC), and relative durations such as `"in 10 minutes"`,
/// `"10 minutes"` or `"90s"`.
pub fn parse_when(when: &str, now: DateTime<Utc>) -> BackendResult<DateTime<Utc>> {
    let trimmed = when.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    if let Some(delay) = parse_duration(trimmed) {
        let delay = chrono::Duration::from_std(delay)
            .map_err(|_| BackendError::InvalidSchedule(when.to_string()))?;
        return now
            .checked_add_signed(delay)
            .ok_or_else(|| BackendError::InvalidSchedule(when.to_string()));
    }

    Err(BackendError::InvalidSchedule(when.to_string()))
}

/// Classify a recurring expression.
///
/// Anything containing `*` or with five or more fields is cron; five-field
/// expressions get a leading seconds field. Everything else must be an
/// interval like `"5 minutes"`.
pub fn parse_recurrence(expression: &str) -> BackendResult<Recurrence> {
    let trimmed = expression.trim();
    let invalid = |reason: &str| BackendError::InvalidExpression {
        expression: expression.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("expression is empty"));
    }

    let fields = trimmed.split_whitespace().count();
    if trimmed.contains('*') || fields >= 5 {
        return match fields {
            5 => Ok(Recurrence::Cron(format!("0 {trimmed}"))),
            6 | 7 => Ok(Recurrence::Cron(trimmed.to_string())),
            _ => Err(invalid("cron expressions need 5 to 7 fields")),
        };
    }

    match parse_duration(trimmed) {
        Some(d) if d.is_zero() => Err(invalid("interval must be greater than zero")),
        Some(d) => Ok(Recurrence::Interval(d)),
        None => Err(invalid("not a cron expression or a known interval")),
    }
}

/// Parse a human duration: `"5 minutes"`, `"in 2 hours"`, `"90s"`, `"minute"`.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim().to_ascii_lowercase();
    let s = s.strip_prefix("in ").unwrap_or(&s).trim();

    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let unit = unit.trim();

    let amount: u64 = if digits.is_empty() {
        // "minute", "hour": implicit one, but a bare unit letter is not enough
        if unit.len() < 3 {
            return None;
        }
        1
    } else {
        digits.parse().ok()?
    };

    let millis_per_unit: u64 = match unit {
        "ms" | "millis" | "millisecond" | "milliseconds" => 1,
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000,
        "d" | "day" | "days" => 86_400_000,
        "w" | "week" | "weeks" => 604_800_000,
        _ => return None,
    };

    amount.checked_mul(millis_per_unit).map(Duration::from_millis)
}
