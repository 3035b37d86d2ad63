//! Capture-time stamping
//!
//! Record timestamps are a fixed external format consumed by downstream
//! tooling: `YYYY-MM-DD HH:MM:SS.mmm`, 24-hour, milliseconds truncated.

use crate::core::line::LogLine;
use chrono::{Local, NaiveDateTime};
use std::fmt;

/// Record timestamp format
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Log file name timestamp format
pub const FILE_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Wall-clock source
pub trait Clock {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;
}

/// The system's local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// A timestamped line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    timestamp: NaiveDateTime,
    text: String,
}

impl Record {
    /// Stamp a line with the given capture time
    pub fn stamp(line: LogLine, at: NaiveDateTime) -> Self {
        Self {
            timestamp: at,
            text: line.into_string(),
        }
    }

    /// Stamp a line with the clock's current time
    pub fn capture(line: LogLine, clock: &dyn Clock) -> Self {
        Self::stamp(line, clock.now())
    }

    /// Capture time
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Line text
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format(RECORD_TIME_FORMAT), self.text)
    }
}

/// Timestamp portion of a log file name
pub fn file_stamp(at: NaiveDateTime) -> String {
    at.format(FILE_TIME_FORMAT).to_string()
}
