//! Bounded, arrival-ordered value history per (subject, metric).

use std::collections::{HashMap, VecDeque};

use vigil_core::{Metric, Reading};

use crate::detector::{AnomalyResult, VitalAnomalyDetector};

/// Number of most recent values kept per metric.
pub const HISTORY_CAPACITY: usize = 20;

/// Prior samples required before any anomaly can be reported.
pub const MIN_HISTORY: usize = 5;

/// Last-N values of one metric for one subject, oldest first.
///
/// Invariant: `len() <= capacity`, iteration order is arrival order.
#[derive(Debug, Clone)]
pub struct MetricHistory {
    values: VecDeque<f64>,
    capacity: usize,
}

impl MetricHistory {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append the newest value, evicting the oldest beyond capacity.
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, f64> {
        self.values.iter()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }
}

impl Default for MetricHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a MetricHistory {
    type Item = &'a f64;
    type IntoIter = std::collections::vec_deque::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// All metric histories of a single subject.
///
/// Owned by exactly one writer (the subject's worker); there is no interior
/// locking.
#[derive(Debug, Clone, Default)]
pub struct VitalHistories {
    by_metric: HashMap<Metric, MetricHistory>,
}

impl VitalHistories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: Metric) -> Option<&MetricHistory> {
        self.by_metric.get(&metric)
    }

    /// Evaluate `reading` against the prior history, then record it.
    ///
    /// Evaluation happens strictly before the append so the current value is
    /// never part of its own mean/σ.
    pub fn observe_and_record(
        &mut self,
        detector: &VitalAnomalyDetector,
        reading: &Reading,
    ) -> AnomalyResult {
        let history = self.by_metric.entry(reading.metric).or_default();
        let result = detector.observe(reading.metric, reading.value, history);
        history.push(reading.value);
        if result.is_anomaly {
            tracing::debug!(
                subject_id = %reading.subject_id,
                metric = %reading.metric,
                value = reading.value,
                severity = ?result.severity,
                "vital anomaly"
            );
        }
        result
    }
}
