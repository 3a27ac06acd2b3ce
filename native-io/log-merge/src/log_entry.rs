use std::fmt::{Display, Formatter};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::merge_traits::SortedRecord;

/// A single timestamped log line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct LogEntry {
    pub date: DateTime<Utc>,
    pub msg: String,
}

impl LogEntry {
    pub fn new(date: DateTime<Utc>, msg: impl Into<String>) -> Self {
        LogEntry { date, msg: msg.into() }
    }

    /// Entry stamped `millis` milliseconds after the Unix epoch.
    ///
    /// Out-of-range values clamp to the epoch.
    pub fn at_millis(millis: i64, msg: impl Into<String>) -> Self {
        let date = Utc
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or_default();
        LogEntry::new(date, msg)
    }
}

impl SortedRecord for LogEntry {
    type Key = DateTime<Utc>;

    fn key(&self) -> Self::Key {
        self.date
    }
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.date.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.msg
        )
    }
}
