//! In-memory metrics collaborator.
//!
//! Handlers receive a shared `MetricsRegistry` through their constructor and
//! record counters and latencies into it. Exporting is left to the embedding
//! program, which reads a `snapshot()`.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;

/// Metric name plus sorted `key=value` labels.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricKey {
    pub name: String,
    pub labels: Vec<(String, String)>,
}

impl MetricKey {
    pub fn new(name: &str, labels: &[(&str, &str)]) -> Self {
        let mut labels: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        labels.sort();
        Self {
            name: name.to_string(),
            labels,
        }
    }
}

/// Summary of latency observations for one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub count: u64,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl LatencySummary {
    fn record(&mut self, value: Duration) {
        if self.count == 0 || value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> Option<Duration> {
        let count = u32::try_from(self.count).ok().filter(|c| *c > 0)?;
        Some(self.total / count)
    }
}

/// Point-in-time copy of every metric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<MetricKey, u64>,
    pub latencies: BTreeMap<MetricKey, LatencySummary>,
}

#[derive(Debug, Default)]
struct Inner {
    counters: BTreeMap<MetricKey, u64>,
    latencies: BTreeMap<MetricKey, LatencySummary>,
}

/// Thread-safe counters and latency summaries.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    inner: Mutex<Inner>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, name: &str, labels: &[(&str, &str)]) {
        self.add(name, labels, 1);
    }

    pub fn add(&self, name: &str, labels: &[(&str, &str)], amount: u64) {
        let mut inner = self.inner.lock();
        let counter = inner.counters.entry(MetricKey::new(name, labels)).or_default();
        *counter = counter.saturating_add(amount);
    }

    pub fn observe(&self, name: &str, labels: &[(&str, &str)], latency: Duration) {
        self.inner
            .lock()
            .latencies
            .entry(MetricKey::new(name, labels))
            .or_default()
            .record(latency);
    }

    /// Current value of a counter; zero if never incremented.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.inner
            .lock()
            .counters
            .get(&MetricKey::new(name, labels))
            .copied()
            .unwrap_or(0)
    }

    pub fn latency(&self, name: &str, labels: &[(&str, &str)]) -> Option<LatencySummary> {
        self.inner
            .lock()
            .latencies
            .get(&MetricKey::new(name, labels))
            .copied()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock();
        MetricsSnapshot {
            counters: inner.counters.clone(),
            latencies: inner.latencies.clone(),
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.counters.clear();
        inner.latencies.clear();
    }
}
