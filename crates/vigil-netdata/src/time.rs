use chrono::DateTime;
use serde_json::Value;
use vigil_core::{VigilError, VigilResult};

/// Largest magnitude, in seconds, still read as a relative offset (3 years).
///
/// Netdata applies the same cut-off: anything bigger is a unix timestamp.
pub const RELATIVE_TIME_MAX: i64 = 3 * 365 * 86_400;

/// A point in time for a data query.
///
/// Parsing rule:
/// - `"now"` or `0` is [`TimeRef::Now`];
/// - an integer (or numeric string) with `|v| <= RELATIVE_TIME_MAX` is an
///   offset in seconds, negative meaning the past;
/// - any larger integer, or an RFC 3339 timestamp, is absolute epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRef {
    Now,
    Relative(i64),
    Absolute(i64),
}

impl TimeRef {
    pub fn from_seconds(value: i64) -> Self {
        if value == 0 {
            TimeRef::Now
        } else if value.unsigned_abs() <= RELATIVE_TIME_MAX.unsigned_abs() {
            TimeRef::Relative(value)
        } else {
            TimeRef::Absolute(value)
        }
    }

    pub fn parse_str(input: &str) -> VigilResult<Self> {
        let s = input.trim();
        if s.eq_ignore_ascii_case("now") {
            return Ok(TimeRef::Now);
        }
        if let Ok(seconds) = s.parse::<i64>() {
            return Ok(Self::from_seconds(seconds));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| TimeRef::Absolute(dt.timestamp()))
            .map_err(|_| {
                VigilError::Validation(format!(
                    "cannot read '{input}' as a time: use 'now', seconds relative to now \
                     (e.g. -3600), a unix timestamp, or an RFC 3339 date"
                ))
            })
    }

    /// Parse a validated `Time` tool argument.
    pub fn parse(value: &Value) -> VigilResult<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Self::from_seconds)
                .ok_or_else(|| VigilError::Validation(format!("time must be an integer, got {n}"))),
            Value::String(s) => Self::parse_str(s),
            other => Err(VigilError::Validation(format!(
                "time must be an integer or string, got {other}"
            ))),
        }
    }

    /// Value sent as the `after`/`before` query parameter.
    pub fn as_query_value(&self) -> i64 {
        match self {
            TimeRef::Now => 0,
            TimeRef::Relative(s) | TimeRef::Absolute(s) => *s,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_now_forms() {
        assert_eq!(TimeRef::parse(&json!("now")).unwrap(), TimeRef::Now);
        assert_eq!(TimeRef::parse(&json!("NOW")).unwrap(), TimeRef::Now);
        assert_eq!(TimeRef::parse(&json!(0)).unwrap(), TimeRef::Now);
    }

    #[test]
    fn test_relative_offsets() {
        assert_eq!(TimeRef::parse(&json!(-60)).unwrap(), TimeRef::Relative(-60));
        assert_eq!(TimeRef::parse(&json!("-3600")).unwrap(), TimeRef::Relative(-3600));
        assert_eq!(
            TimeRef::from_seconds(-RELATIVE_TIME_MAX),
            TimeRef::Relative(-RELATIVE_TIME_MAX)
        );
    }

    #[test]
    fn test_epoch_is_absolute() {
        assert_eq!(
            TimeRef::parse(&json!(1_700_000_000)).unwrap(),
            TimeRef::Absolute(1_700_000_000)
        );
        assert_eq!(
            TimeRef::from_seconds(RELATIVE_TIME_MAX + 1),
            TimeRef::Absolute(RELATIVE_TIME_MAX + 1)
        );
    }

    #[test]
    fn test_extreme_integers_do_not_overflow() {
        assert_eq!(TimeRef::from_seconds(i64::MIN), TimeRef::Absolute(i64::MIN));
        assert_eq!(TimeRef::from_seconds(i64::MAX), TimeRef::Absolute(i64::MAX));
        assert_eq!(
            TimeRef::parse(&json!("-9223372036854775808")).unwrap(),
            TimeRef::Absolute(i64::MIN)
        );
    }

    #[test]
    fn test_rfc3339_is_absolute() {
        let t = TimeRef::parse(&json!("2024-01-01T00:00:00Z")).unwrap();
        assert_eq!(t, TimeRef::Absolute(1_704_067_200));
        assert_eq!(t.as_query_value(), 1_704_067_200);
    }

    #[test]
    fn test_garbage_is_validation_error() {
        let err = TimeRef::parse(&json!("yesterday-ish")).unwrap_err();
        assert!(matches!(err, VigilError::Validation(_)));
        assert!(TimeRef::parse(&json!(true)).is_err());
    }

    #[test]
    fn test_query_values() {
        assert_eq!(TimeRef::Now.as_query_value(), 0);
        assert_eq!(TimeRef::Relative(-120).as_query_value(), -120);
    }
}
