//! Rolling in-memory window of recent samples.
//!
//! Seeded once from the store at startup and then updated incrementally, so
//! rendering never re-reads the full history.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::storage::Sample;

/// Default window span in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 2;

/// Time-bounded series of the most recent samples, oldest first.
///
/// Backed by a `VecDeque`: pushes go to the tail and expired samples are
/// popped from the head, amortized O(1) per tick.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    span: Duration,
    samples: VecDeque<Sample>,
}

impl RollingWindow {
    /// Create an empty window covering `span`.
    pub fn new(span: Duration) -> Self {
        Self {
            span,
            samples: VecDeque::new(),
        }
    }

    /// Create an empty window covering `days` days.
    pub fn with_days(days: u32) -> Self {
        Self::new(Duration::try_days(i64::from(days)).unwrap_or(Duration::MAX))
    }

    /// Seed a window from an ordered series (normally `query_range(now - span)`).
    pub fn from_samples(span: Duration, samples: impl IntoIterator<Item = Sample>) -> Self {
        Self {
            span,
            samples: samples.into_iter().collect(),
        }
    }

    /// Span covered by the window.
    pub fn span(&self) -> Duration {
        self.span
    }

    /// Oldest instant a sample may have and still be kept at `now`.
    ///
    /// Saturates at the earliest representable instant.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.span)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Append a sample and evict everything older than `now - span`.
    ///
    /// A sample with the same timestamp as the current tail replaces it.
    pub fn push(&mut self, sample: Sample, now: DateTime<Utc>) {
        match self.samples.back_mut() {
            Some(last) if last.ts == sample.ts => *last = sample,
            _ => self.samples.push_back(sample),
        }
        self.evict(now);
    }

    /// Drop samples with `ts < now - span` from the head.
    ///
    /// Returns how many samples were evicted.
    pub fn evict(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = self.cutoff(now);
        let mut evicted = 0;
        while self.samples.front().is_some_and(|s| s.ts < cutoff) {
            self.samples.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Iterate samples oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl<'a> IntoIterator for &'a RollingWindow {
    type Item = &'a Sample;
    type IntoIter = std::collections::vec_deque::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
