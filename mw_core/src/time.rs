// ABOUTME: Wall-clock timestamps for log lines and a monotonic tick timer
// ABOUTME: The timer drives tick pacing so processing time counts against the period
use ::time::{format_description::well_known::Rfc3339, OffsetDateTime};
use std::time::{Duration, Instant, SystemTime};

/// Format `time` as RFC3339 in UTC
///
/// ```
/// use mw_core::to_rfc3339;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let new_year = UNIX_EPOCH + Duration::from_secs(1_609_459_200);
/// assert_eq!(to_rfc3339(new_year), "2021-01-01T00:00:00Z");
/// ```
pub fn to_rfc3339(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_default()
}

pub fn now_rfc3339() -> String {
    to_rfc3339(SystemTime::now())
}

/// Started on construction; never affected by wall-clock adjustments
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTimer {
    started: Instant,
}

impl MonotonicTimer {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// What is left of `period` after the time already spent, never negative
    pub fn remaining(&self, period: Duration) -> Duration {
        period.saturating_sub(self.elapsed())
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}
