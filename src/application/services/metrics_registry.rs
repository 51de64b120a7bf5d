//! In-memory request metrics.
//!
//! Counters are monotonic for the lifetime of the registry. Latency
//! observations keep running totals plus a bounded window of recent samples.
//! Every update is mirrored into the [`metrics`] facade so an exporter can be
//! installed without touching call sites.
//!
//! Nothing in here may fail a request: lock poisoning is recovered from and
//! non-finite samples are dropped.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Samples retained per latency series for min/max/mean over recent traffic.
const RECENT_SAMPLES: usize = 1024;

#[derive(Debug, Default)]
struct LatencySeries {
    count: u64,
    sum: f64,
    recent: VecDeque<f64>,
}

impl LatencySeries {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        if self.recent.len() == RECENT_SAMPLES {
            self.recent.pop_front();
        }
        self.recent.push_back(value);
    }

    fn summary(&self) -> LatencySummary {
        let min = self.recent.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let recent_mean = if self.recent.is_empty() {
            0.0
        } else {
            self.recent.iter().sum::<f64>() / self.recent.len() as f64
        };

        LatencySummary {
            count: self.count,
            sum: self.sum,
            min: if min.is_finite() { min } else { 0.0 },
            max: if max.is_finite() { max } else { 0.0 },
            recent_mean,
        }
    }
}

/// Aggregates of one latency series.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LatencySummary {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub recent_mean: f64,
}

/// Point-in-time copy of the registry. Metric names are kept verbatim.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub started_at: DateTime<Utc>,
    pub counters: BTreeMap<String, u64>,
    pub latencies: BTreeMap<String, LatencySummary>,
}

/// Process-lifetime counters and latency observations.
///
/// Constructed once by bootstrap and shared through `AppState`; tests build
/// their own isolated instances.
#[derive(Debug)]
pub struct MetricsRegistry {
    started_at: DateTime<Utc>,
    counters: Mutex<HashMap<String, u64>>,
    latencies: Mutex<HashMap<String, LatencySeries>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            counters: Mutex::new(HashMap::new()),
            latencies: Mutex::new(HashMap::new()),
        }
    }

    /// Increments the named counter by one.
    pub fn inc(&self, name: &str) {
        {
            let mut counters = recover(self.counters.lock());
            let counter = counters.entry(name.to_owned()).or_insert(0);
            *counter = counter.saturating_add(1);
        }
        metrics::counter!(name.to_owned()).increment(1);
    }

    /// Records one latency sample. Non-finite or negative values are ignored.
    pub fn observe(&self, name: &str, value: f64) {
        if !value.is_finite() || value < 0.0 {
            tracing::debug!(metric = name, value, "dropping invalid latency sample");
            return;
        }
        recover(self.latencies.lock())
            .entry(name.to_owned())
            .or_default()
            .record(value);
        metrics::histogram!(name.to_owned()).record(value);
    }

    /// Current value of a counter, `0` if it was never incremented.
    pub fn counter(&self, name: &str) -> u64 {
        recover(self.counters.lock()).get(name).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = recover(self.counters.lock())
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        let latencies = recover(self.latencies.lock())
            .iter()
            .map(|(k, series)| (k.clone(), series.summary()))
            .collect();

        MetricsSnapshot {
            started_at: self.started_at,
            counters,
            latencies,
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A panic while holding the lock leaves plain counters that are still valid.
fn recover<'a, T>(
    result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}
