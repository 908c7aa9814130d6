//! Metric sinks: where gathered metrics are recorded.

use crate::metrics::data::{Fields, Metric, Tags};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

/// Destination for metrics produced during a collection cycle.
///
/// Implementations must tolerate concurrent calls: every command task of a
/// cycle writes to the same sink.
pub trait MetricSink: Send + Sync {
    /// Record one metric.
    fn add_metric(&self, name: &str, fields: Fields, tags: Tags, timestamp: DateTime<Utc>);
}

/// Thread-safe in-memory sink.
#[derive(Debug, Default)]
pub struct Accumulator {
    metrics: Mutex<Vec<Metric>>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every metric recorded so far, in arrival order.
    pub fn metrics(&self) -> Vec<Metric> {
        self.lock().clone()
    }

    /// Take every recorded metric, leaving the accumulator empty.
    pub fn drain(&self) -> Vec<Metric> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panicking writer cannot leave the vector half-updated, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Vec<Metric>> {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MetricSink for Accumulator {
    fn add_metric(&self, name: &str, fields: Fields, tags: Tags, timestamp: DateTime<Utc>) {
        match Metric::new(name, fields, tags, timestamp) {
            Ok(metric) => self.lock().push(metric),
            Err(err) => tracing::warn!("Dropping invalid metric: {}", err),
        }
    }
}
