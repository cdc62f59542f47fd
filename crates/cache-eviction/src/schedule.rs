//! Cron schedule parsing

use crate::error::{EvictionError, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// A validated cron expression.
///
/// Accepts the classic five-field form (minute precision) and the six-field
/// form with a leading seconds column.
#[derive(Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: cron::Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let fields = trimmed.split_whitespace().count();

        let normalized = match fields {
            5 => format!("0 {}", trimmed),
            6 => trimmed.to_string(),
            n => {
                return Err(EvictionError::Schedule(format!(
                    "expected 5 or 6 fields in {:?}, found {}",
                    expression, n
                )))
            }
        };

        let schedule = cron::Schedule::from_str(&normalized)
            .map_err(|e| EvictionError::Schedule(format!("{:?}: {}", expression, e)))?;

        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Next fire time strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronSchedule").field(&self.expression).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_five_field_expression() {
        let schedule = CronSchedule::parse("*/15 * * * *").unwrap();
        assert_eq!(schedule.expression(), "*/15 * * * *");

        let from = Utc.with_ymd_and_hms(2024, 5, 1, 10, 7, 30).unwrap();
        let next = schedule.next_after(from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 0).unwrap());
    }

    #[test]
    fn test_six_field_expression() {
        let schedule = CronSchedule::parse("30 0 * * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 5, 1, 10, 7, 30).unwrap();
        let next = schedule.next_after(from).unwrap();
        assert_eq!(next.minute(), 0);
        assert_eq!(next.second(), 30);
        assert_eq!(next.hour(), 11);
    }

    #[test]
    fn test_invalid_field_count() {
        let err = CronSchedule::parse("* * *").unwrap_err();
        assert!(matches!(err, EvictionError::Schedule(_)));
    }

    #[test]
    fn test_invalid_field_value() {
        assert!(CronSchedule::parse("61 * * * *").is_err());
        assert!(CronSchedule::parse("not a cron string at all").is_err());
    }
}
