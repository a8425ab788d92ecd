use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const TIMESTAMP_FORMAT_SPACED: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Severity of a log entry, ordered by rank (`Debug` lowest).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    pub fn rank(&self) -> u8 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
            LogLevel::Critical => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

/// `log` has no critical level and one below debug, so trace folds into debug.
impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warning,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug | log::Level::Trace => LogLevel::Debug,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    /// Case-insensitive, so `"warning"` and `"WARNING"` are the same level.
    fn from_str(s: &str) -> Result<Self> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::Validation(format!(
                    "unknown log level '{}', expected one of DEBUG, INFO, WARNING, ERROR, CRITICAL",
                    s
                ))
            })
    }
}

/// Renders a timestamp as ISO-8601 without an offset. Fractional seconds are
/// written with 3, 6 or 9 digits as needed, and left out when zero.
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses the timestamps produced by [`format_timestamp`], the same shape with a
/// space separator, and RFC 3339 strings (converted to local wall-clock time).
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();

    if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        return Ok(timestamp);
    }

    if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT_SPACED) {
        return Ok(timestamp);
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Local).naive_local());
    }

    Err(Error::Validation(format!(
        "invalid date '{}', expected an ISO-8601 date-time",
        value
    )))
}

/// The storage shape shared by every backend: `{date, level, message}`.
///
/// Fields are optional so that a record with a missing key still decodes and
/// can be rejected with a useful message by [`LogEntry::from_record`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, alias = "msg", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LogRecord {
    pub fn new(
        date: impl Into<String>,
        level: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            date: Some(date.into()),
            level: Some(level.into()),
            message: Some(message.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(timestamp: NaiveDateTime, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
        }
    }

    /// Entry stamped with the current local time.
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self::new(Local::now().naive_local(), level, message)
    }

    /// Builds an entry from its textual parts, validating the date and level.
    pub fn parse(date: &str, level: &str, message: impl Into<String>) -> Result<Self> {
        let timestamp = parse_timestamp(date)?;
        let level = level.parse::<LogLevel>()?;
        Ok(Self::new(timestamp, level, message))
    }

    pub fn to_record(&self) -> LogRecord {
        LogRecord::new(
            format_timestamp(&self.timestamp),
            self.level.as_str(),
            self.message.as_str(),
        )
    }

    pub fn from_record(record: &LogRecord) -> Result<Self> {
        let date = required(&record.date, "date")?;
        let level = required(&record.level, "level")?;
        let message = required(&record.message, "message")?;

        Self::parse(date, level, message)
    }
}

fn required<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str> {
    field
        .as_deref()
        .ok_or_else(|| Error::Validation(format!("missing field '{}' in log record", name)))
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            format_timestamp(&self.timestamp),
            self.level,
            self.message
        )
    }
}
