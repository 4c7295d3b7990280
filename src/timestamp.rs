// src/timestamp.rs
//! # Timestamps
//! Parsing, canonical formatting and range checks for the optional
//! `timestampFrom` / `timestampTo` sub-range a source can point at.
//!
//! Accepted input is `HH:MM:SS`, `MM:SS` or `SS` (1–2 digits per component).
//! Canonical output drops leading zero components: `1:02:03`, `4:05`, `0:07`,
//! and `0:00` for an all-zero value.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static RE_STRICT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{1,2})(?::([0-9]{1,2}))?(?::([0-9]{1,2}))?$").expect("timestamp regex")
});

// Server-side check: shape only, no range limits. ASCII digits only.
static RE_LOOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{1,2}:)?([0-9]{1,2}:)?[0-9]{1,2}$").expect("loose timestamp regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("Invalid timestamp format: '{0}'. Use HH:MM:SS, MM:SS or SS")]
    InvalidFormat(String),
    #[error("Invalid timestamp values: '{0}'. Hours must be 0-23, minutes and seconds 0-59")]
    OutOfRange(String),
    #[error("end time must be after start time")]
    EndBeforeStart,
}

/// A validated position inside a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    hours: u8,
    minutes: u8,
    seconds: u8,
}

impl Timestamp {
    pub const MAX_HOURS: u8 = 23;

    pub fn new(hours: u8, minutes: u8, seconds: u8) -> Option<Self> {
        if hours > Self::MAX_HOURS || minutes > 59 || seconds > 59 {
            return None;
        }
        Some(Self {
            hours,
            minutes,
            seconds,
        })
    }

    pub fn total_seconds(&self) -> u32 {
        self.hours as u32 * 3600 + self.minutes as u32 * 60 + self.seconds as u32
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hours > 0 {
            write!(f, "{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
        } else {
            write!(f, "{}:{:02}", self.minutes, self.seconds)
        }
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse a non-empty timestamp. Surrounding whitespace is ignored.
pub fn parse(input: &str) -> Result<Timestamp, TimestampError> {
    let raw = input.trim();
    let caps = RE_STRICT
        .captures(raw)
        .ok_or_else(|| TimestampError::InvalidFormat(raw.to_string()))?;

    let parts: Vec<u8> = caps
        .iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str().parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| TimestampError::InvalidFormat(raw.to_string()))?;

    let (h, m, s) = match parts.as_slice() {
        [s] => (0, 0, *s),
        [m, s] => (0, *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(TimestampError::InvalidFormat(raw.to_string())),
    };

    Timestamp::new(h, m, s).ok_or_else(|| TimestampError::OutOfRange(raw.to_string()))
}

/// Validate free text from a form field.
/// Empty input means "unset" and yields `Ok(None)`; otherwise the canonical string.
pub fn validate(input: &str) -> Result<Option<String>, TimestampError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    parse(input).map(|t| Some(t.to_string()))
}

/// Check a from/to pair of already-canonical (or empty) timestamps.
/// Missing `from` counts as 0, missing `to` as open-ended.
pub fn validate_range(from: Option<&str>, to: Option<&str>) -> Result<(), TimestampError> {
    let from_secs = match from.filter(|s| !s.trim().is_empty()) {
        Some(s) => parse(s)?.total_seconds(),
        None => 0,
    };
    let to_secs = match to.filter(|s| !s.trim().is_empty()) {
        Some(s) => parse(s)?.total_seconds(),
        None => u32::MAX,
    };
    if from_secs > to_secs {
        return Err(TimestampError::EndBeforeStart);
    }
    Ok(())
}

/// Validate and canonicalize both ends of a range in one step.
pub fn validate_pair(
    from: &str,
    to: &str,
) -> Result<(Option<String>, Option<String>), TimestampError> {
    let from = validate(from)?;
    let to = validate(to)?;
    validate_range(from.as_deref(), to.as_deref())?;
    Ok((from, to))
}

/// Shape check used by the HTTP API: `(D:)?(D:)?D` with 1–2 ASCII digits per field.
pub fn matches_loose_pattern(input: &str) -> bool {
    RE_LOOSE.is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_shapes() {
        assert_eq!(parse("1:02:03").unwrap().total_seconds(), 3723);
        assert_eq!(parse("4:05").unwrap().total_seconds(), 245);
        assert_eq!(parse("7").unwrap().total_seconds(), 7);
        assert_eq!(parse(" 12:30 ").unwrap().total_seconds(), 750);
    }

    #[test]
    fn canonical_formatting() {
        assert_eq!(validate("1:5").unwrap().as_deref(), Some("1:05"));
        assert_eq!(validate("01:02:03").unwrap().as_deref(), Some("1:02:03"));
        assert_eq!(validate("0:0:0").unwrap().as_deref(), Some("0:00"));
        assert_eq!(validate("00:07").unwrap().as_deref(), Some("0:07"));
        assert_eq!(validate("5").unwrap().as_deref(), Some("0:05"));
    }

    #[test]
    fn empty_is_unset() {
        assert_eq!(validate("").unwrap(), None);
        assert_eq!(validate("   ").unwrap(), None);
    }

    #[test]
    fn format_and_range_errors_are_distinct() {
        assert!(matches!(parse("1:2:3:4"), Err(TimestampError::InvalidFormat(_))));
        assert!(matches!(parse("abc"), Err(TimestampError::InvalidFormat(_))));
        assert!(matches!(parse("123"), Err(TimestampError::InvalidFormat(_))));
        assert!(matches!(parse("24:00:00"), Err(TimestampError::OutOfRange(_))));
        assert!(matches!(parse("1:60"), Err(TimestampError::OutOfRange(_))));
        assert!(matches!(parse("75"), Err(TimestampError::OutOfRange(_))));
    }

    #[test]
    fn range_rules() {
        assert!(validate_range(Some("1:05"), Some("2:00")).is_ok());
        assert!(validate_range(Some("2:00"), Some("2:00")).is_ok());
        assert!(validate_range(None, Some("0:10")).is_ok());
        assert!(validate_range(Some("23:59:59"), None).is_ok());
        assert_eq!(
            validate_range(Some("2:00"), Some("1:00")),
            Err(TimestampError::EndBeforeStart)
        );
    }

    #[test]
    fn end_before_start_message() {
        let err = validate_pair("2:00", "1:00").unwrap_err();
        assert_eq!(err.to_string(), "end time must be after start time");
    }

    #[test]
    fn loose_pattern_accepts_shape_only() {
        assert!(matches_loose_pattern("99:99:99"));
        assert!(matches_loose_pattern("5"));
        assert!(!matches_loose_pattern("1:2:3:4"));
        assert!(!matches_loose_pattern("1:234"));
        assert!(!matches_loose_pattern(""));
    }

    #[test]
    fn only_ascii_digits_count() {
        // Arabic-Indic digits
        assert!(!matches_loose_pattern("\u{661}"));
        assert!(!matches_loose_pattern("\u{661}:\u{662}\u{663}"));
        assert!(matches!(
            parse("\u{661}:\u{662}\u{663}"),
            Err(TimestampError::InvalidFormat(_))
        ));
        // fullwidth
        assert!(!matches_loose_pattern("\u{ff11}:00"));
    }
}
