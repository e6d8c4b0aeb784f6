//! Classification of scheduling intent strings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ParseAmbiguityError;

/// Intent used when the caller gives none.
pub const NOW: &str = "now";

const EVERY_PREFIX: &str = "every ";

/// When a dispatched job should run.
///
/// Delayed variants carry the caller's string unmodified; resolving it to
/// an instant is the backend's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulingIntent {
    /// Enqueue right away.
    Immediate,
    /// Re-enqueue on a repeating schedule.
    Recurring {
        /// Cron string or interval, with any leading `"every "` removed.
        expression: String,
    },
    /// Run once at an absolute point in time.
    DelayedAt {
        /// Timestamp as given.
        instant: String,
    },
    /// Run once after a relative delay.
    DelayedBy {
        /// Duration as given.
        duration: String,
    },
}

impl SchedulingIntent {
    /// Classify an intent. `None` means `"now"`.
    ///
    /// Rules apply in order: exact `"now"` is immediate; anything containing
    /// `"every"` or `"*"` is recurring; any other non-empty string is delayed.
    pub fn parse(intent: Option<&str>) -> Result<Self, ParseAmbiguityError> {
        let intent = intent.unwrap_or(NOW);

        if intent == NOW {
            return Ok(Self::Immediate);
        }
        if intent.is_empty() {
            return Err(ParseAmbiguityError);
        }
        if intent.contains("every") || intent.contains('*') {
            let expression = intent.strip_prefix(EVERY_PREFIX).unwrap_or(intent);
            return Ok(Self::Recurring {
                expression: expression.to_string(),
            });
        }
        if looks_like_timestamp(intent) {
            Ok(Self::DelayedAt {
                instant: intent.to_string(),
            })
        } else {
            Ok(Self::DelayedBy {
                duration: intent.to_string(),
            })
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Recurring { .. } => "recurring",
            Self::DelayedAt { .. } => "delayed_at",
            Self::DelayedBy { .. } => "delayed_by",
        }
    }

    /// Whether the job runs once, later.
    pub fn is_delayed(&self) -> bool {
        matches!(self, Self::DelayedAt { .. } | Self::DelayedBy { .. })
    }
}

impl FromStr for SchedulingIntent {
    type Err = ParseAmbiguityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(Some(s))
    }
}

impl fmt::Display for SchedulingIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => write!(f, "{NOW}"),
            Self::Recurring { expression } => write!(f, "every {expression}"),
            Self::DelayedAt { instant } => write!(f, "at {instant}"),
            Self::DelayedBy { duration } => write!(f, "after {duration}"),
        }
    }
}

fn looks_like_timestamp(s: &str) -> bool {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recurring(expression: &str) -> SchedulingIntent {
        SchedulingIntent::Recurring {
            expression: expression.to_string(),
        }
    }

    #[test]
    fn test_now_and_default_are_immediate() {
        assert_eq!(SchedulingIntent::parse(None), Ok(SchedulingIntent::Immediate));
        assert_eq!(
            SchedulingIntent::parse(Some("now")),
            Ok(SchedulingIntent::Immediate)
        );
    }

    #[test]
    fn test_now_is_case_sensitive() {
        assert_eq!(
            SchedulingIntent::parse(Some("NOW")),
            Ok(SchedulingIntent::DelayedBy {
                duration: "NOW".into()
            })
        );
        assert!(SchedulingIntent::parse(Some(" now")).unwrap().is_delayed());
    }

    #[test]
    fn test_every_prefix_stripped_once() {
        assert_eq!(
            SchedulingIntent::parse(Some("every 5 minutes")),
            Ok(recurring("5 minutes"))
        );
        assert_eq!(
            SchedulingIntent::parse(Some("every every 2 hours")),
            Ok(recurring("every 2 hours"))
        );
        assert_eq!(SchedulingIntent::parse(Some("every ")), Ok(recurring("")));
    }

    #[test]
    fn test_every_substring_without_prefix_kept_whole() {
        assert_eq!(
            SchedulingIntent::parse(Some("run every day")),
            Ok(recurring("run every day"))
        );
        assert_eq!(
            SchedulingIntent::parse(Some("everyday")),
            Ok(recurring("everyday"))
        );
    }

    #[test]
    fn test_star_is_recurring_even_with_timestamp() {
        assert_eq!(
            SchedulingIntent::parse(Some("*/5 * * * *")),
            Ok(recurring("*/5 * * * *"))
        );
        assert_eq!(
            SchedulingIntent::parse(Some("2024-01-01T00:00:00Z*")),
            Ok(recurring("2024-01-01T00:00:00Z*"))
        );
    }

    #[test]
    fn test_timestamps_are_delayed_at_unmodified() {
        for ts in ["2024-01-01T00:00:00Z", "2024-01-01 08:30:00", "2024-01-01"] {
            assert_eq!(
                SchedulingIntent::parse(Some(ts)),
                Ok(SchedulingIntent::DelayedAt {
                    instant: ts.to_string()
                })
            );
        }
    }

    #[test]
    fn test_other_strings_are_delayed_by_unmodified() {
        for raw in ["in 10 minutes", "10 minutes", "tomorrow-ish"] {
            assert_eq!(
                SchedulingIntent::parse(Some(raw)),
                Ok(SchedulingIntent::DelayedBy {
                    duration: raw.to_string()
                })
            );
        }
    }

    #[test]
    fn test_empty_intent_is_ambiguous() {
        assert_eq!(SchedulingIntent::parse(Some("")), Err(ParseAmbiguityError));
        assert!("".parse::<SchedulingIntent>().is_err());
    }

    #[test]
    fn test_display_and_kind() {
        let intent: SchedulingIntent = "every 5 minutes".parse().unwrap();
        assert_eq!(intent.kind(), "recurring");
        assert_eq!(intent.to_string(), "every 5 minutes");
        assert_eq!(SchedulingIntent::Immediate.to_string(), "now");
    }
}
