//! Log record encoding.
//!
//! One record per line:
//!
//! ```text
//! <timestamp>|<action>|<key>|<value>\n
//! 20000515122456.000000000|U|cpu.temp|41.5
//! ```
//!
//! Only the first three separators are significant; the value may itself
//! contain `|`. The timestamp is local wall time, `YYYYMMDDhhmmss.nnnnnnnnn`.

use crate::clock::Timestamp;
use chrono::NaiveDate;
use std::fmt;
use std::io::{self, Write};
use thiserror::Error;

/// Field separator inside a record.
pub const FIELD_SEPARATOR: char = '|';

/// Number of fields in a record.
pub const FIELD_COUNT: usize = 4;

/// Minimum data key length in bytes.
pub const MIN_KEY_LENGTH: usize = 2;

/// Length of an encoded timestamp.
pub const TIMESTAMP_LEN: usize = 24;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%.9f";
const DATE_FORMAT: &str = "%Y%m%d";

/// Kind of storage transaction recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// A new value for a key.
    Update,
    /// Removal of a key (tombstone).
    Delete,
}

impl Action {
    /// Character used for this action in a record.
    pub fn as_char(self) -> char {
        match self {
            Self::Update => 'U',
            Self::Delete => 'D',
        }
    }

    /// Parses the single-character action field.
    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "U" => Some(Self::Update),
            "D" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update => f.write_str("U - Update"),
            Self::Delete => f.write_str("D - Delete"),
        }
    }
}

/// Reasons a log line is rejected during replay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The line does not split into four fields.
    #[error("invalid number of fields: {0}")]
    FieldCount(usize),

    /// The timestamp field is malformed or out of range.
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// The action field is not exactly `U` or `D`.
    #[error("invalid action: {0:?}")]
    InvalidAction(String),

    /// The record date differs from the date in the file name.
    #[error("date mismatch: record {record} in file dated {file}")]
    DateMismatch {
        /// Date of the record timestamp.
        record: String,
        /// Date embedded in the file name.
        file: String,
    },

    /// The key is shorter than [`MIN_KEY_LENGTH`].
    #[error("invalid key length (>= 2 characters): {0:?}")]
    InvalidKey(String),
}

/// A single parsed log record borrowing from its line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord<'a> {
    /// Time of the write.
    pub timestamp: Timestamp,
    /// Update or delete.
    pub action: Action,
    /// Data key.
    pub key: &'a str,
    /// Raw value; empty for deletes.
    pub value: &'a str,
}

impl<'a> LogRecord<'a> {
    /// Creates an update record.
    pub fn update(timestamp: Timestamp, key: &'a str, value: &'a str) -> Self {
        Self {
            timestamp,
            action: Action::Update,
            key,
            value,
        }
    }

    /// Creates a delete (tombstone) record.
    pub fn delete(timestamp: Timestamp, key: &'a str) -> Self {
        Self {
            timestamp,
            action: Action::Delete,
            key,
            value: "",
        }
    }

    /// Parses a line (without its trailing newline) read from a file dated
    /// `file_date`.
    pub fn parse(line: &'a str, file_date: NaiveDate) -> Result<Self, RecordError> {
        let fields: Vec<&str> = line.splitn(FIELD_COUNT, FIELD_SEPARATOR).collect();
        let &[ts_field, action_field, key, value] = fields.as_slice() else {
            return Err(RecordError::FieldCount(fields.len()));
        };

        let timestamp = parse_timestamp(ts_field)
            .ok_or_else(|| RecordError::InvalidTimestamp(ts_field.to_string()))?;

        let action = Action::from_field(action_field)
            .ok_or_else(|| RecordError::InvalidAction(action_field.to_string()))?;

        if timestamp.date() != file_date {
            return Err(RecordError::DateMismatch {
                record: ts_field[..8].to_string(),
                file: file_date.format(DATE_FORMAT).to_string(),
            });
        }

        if key.len() < MIN_KEY_LENGTH {
            return Err(RecordError::InvalidKey(key.to_string()));
        }

        Ok(Self {
            timestamp,
            action,
            key,
            value,
        })
    }

    /// Writes the record followed by a newline.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "{}{sep}{}{sep}{}{sep}{}",
            format_timestamp(self.timestamp),
            self.action.as_char(),
            self.key,
            self.value,
            sep = FIELD_SEPARATOR,
        )
    }
}

/// Formats a timestamp as `YYYYMMDDhhmmss.nnnnnnnnn`.
pub fn format_timestamp(timestamp: Timestamp) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Formats a date as `YYYYMMDD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a fixed-width `YYYYMMDDhhmmss.nnnnnnnnn` timestamp.
pub fn parse_timestamp(field: &str) -> Option<Timestamp> {
    let bytes = field.as_bytes();
    if bytes.len() != TIMESTAMP_LEN || bytes[14] != b'.' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 14 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }

    let num = |range: std::ops::Range<usize>| field[range].parse::<u32>().ok();
    let date = NaiveDate::from_ymd_opt(num(0..4)? as i32, num(4..6)?, num(6..8)?)?;
    date.and_hms_nano_opt(num(8..10)?, num(10..12)?, num(12..14)?, num(15..24)?)
}

/// Parses a fixed-width `YYYYMMDD` date.
pub fn parse_date(field: &str) -> Option<NaiveDate> {
    if field.len() != 8 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(field, DATE_FORMAT).ok()
}
