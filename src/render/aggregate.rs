//! Fixed-width bucket aggregation.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::storage::Sample;

/// Aggregate of the present latencies inside one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketStats {
    /// Bucket start, a multiple of the bucket width since the Unix epoch.
    pub start: DateTime<Utc>,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Number of present latencies in the bucket.
    pub count: usize,
}

#[derive(Debug)]
struct Accumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn new(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            sum: value,
            count: 1,
        }
    }

    fn add(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }
}

/// Bucket a series into fixed-width intervals.
///
/// Samples without a latency are ignored; a bucket holding none with a
/// latency produces no entry. Output is ordered by bucket start and depends
/// only on the input, so equal series give equal buckets.
pub fn aggregate<'a>(
    series: impl IntoIterator<Item = &'a Sample>,
    width: Duration,
) -> Vec<BucketStats> {
    let width_ms = i64::try_from(width.as_millis()).unwrap_or(i64::MAX).max(1);
    let mut buckets: BTreeMap<i64, Accumulator> = BTreeMap::new();

    for sample in series {
        let Some(value) = sample.latency_ms else {
            continue;
        };
        let start_ms = sample.ts.timestamp_millis().div_euclid(width_ms) * width_ms;
        buckets
            .entry(start_ms)
            .and_modify(|acc| acc.add(value))
            .or_insert_with(|| Accumulator::new(value));
    }

    buckets
        .into_iter()
        .filter_map(|(start_ms, acc)| {
            Some(BucketStats {
                start: DateTime::from_timestamp_millis(start_ms)?,
                min: acc.min,
                max: acc.max,
                mean: acc.sum / acc.count as f64,
                count: acc.count,
            })
        })
        .collect()
}
