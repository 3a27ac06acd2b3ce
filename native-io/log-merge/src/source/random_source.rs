use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::log_entry::LogEntry;
use crate::merge_traits::{AsyncLogSource, LogSource};

const MESSAGES: &[&str] = &[
    "request served",
    "cache miss",
    "connection reset by peer",
    "retrying upstream call",
    "user signed in",
    "disk usage above threshold",
    "scheduled job finished",
    "config reloaded",
];

/// Generates a finite ascending run of synthetic [`LogEntry`] values.
///
/// Each entry is between one millisecond and `max_step` after the previous one.
/// The async side waits up to `max_latency` before answering, standing in for
/// a slow remote feed.
#[derive(Debug)]
pub struct RandomLogSource {
    rng: StdRng,
    last: DateTime<Utc>,
    remaining: usize,
    max_step: Duration,
    max_latency: Duration,
}

impl RandomLogSource {
    pub fn new(seed: u64, start: DateTime<Utc>, records: usize) -> Self {
        RandomLogSource {
            rng: StdRng::seed_from_u64(seed),
            last: start,
            remaining: records,
            max_step: Duration::from_secs(3600),
            max_latency: Duration::ZERO,
        }
    }

    pub fn with_max_step(mut self, max_step: Duration) -> Self {
        self.max_step = max_step.max(Duration::from_millis(1));
        self
    }

    pub fn with_max_latency(mut self, max_latency: Duration) -> Self {
        self.max_latency = max_latency;
        self
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn next_entry(&mut self) -> Option<LogEntry> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let max_step_ms = self.max_step.as_millis().min(i64::MAX as u128) as i64;
        let step = self.rng.gen_range(1..=max_step_ms);
        self.last += chrono::Duration::milliseconds(step);
        let msg = MESSAGES[self.rng.gen_range(0..MESSAGES.len())];
        Some(LogEntry::new(self.last, msg))
    }

    fn next_latency(&mut self) -> Duration {
        if self.max_latency.is_zero() {
            Duration::ZERO
        } else {
            self.rng.gen_range(Duration::ZERO..=self.max_latency)
        }
    }
}

impl LogSource for RandomLogSource {
    type Record = LogEntry;

    fn pop(&mut self) -> Result<Option<LogEntry>> {
        Ok(self.next_entry())
    }
}

#[async_trait]
impl AsyncLogSource for RandomLogSource {
    type Record = LogEntry;

    async fn pop_async(&mut self) -> Result<Option<LogEntry>> {
        let latency = self.next_latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok(self.next_entry())
    }
}
