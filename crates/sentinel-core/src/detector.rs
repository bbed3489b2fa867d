//! Observer-effect detection: time-windowed observation buffers per node,
//! cumulative threat per observer, and anomaly scoring over the live window.
//!
//! The detector holds no lock of its own; the orchestrator serializes every
//! mutating call under its circuit mutex. Window cleanup is amortized inline
//! on each `record_observation` rather than by a background sweep, trading a
//! little per-call latency for not having a scheduler at all.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::CircuitConfig;
use crate::observation::ObservationLog;
use crate::types::{Operation, ThreatLevel};

/// Outcome of one anomaly pass over a node's live window.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnomalyReading {
    pub rate_per_sec: f64,
    pub anomaly_score: f64,
    pub is_anomaly: bool,
}

pub struct ObserverEffectDetector {
    window_seconds: f64,
    rate_alarm_per_sec: f64,
    sensitive_count_threshold: usize,
    anomaly_score_threshold: f64,
    buffers: HashMap<String, VecDeque<ObservationLog>>,
    /// Running cumulative threat per observer, across all nodes.
    /// Never decays; only an administrator resets a flagged observer.
    cumulative: HashMap<String, f64>,
}

impl ObserverEffectDetector {
    pub fn new(cfg: &CircuitConfig) -> Self {
        Self {
            window_seconds: cfg.window_seconds,
            rate_alarm_per_sec: cfg.rate_alarm_per_sec,
            sensitive_count_threshold: cfg.sensitive_count_threshold,
            anomaly_score_threshold: cfg.anomaly_score_threshold,
            buffers: HashMap::new(),
            cumulative: HashMap::new(),
        }
    }

    fn is_stale(&self, entry: &ObservationLog, now: DateTime<Utc>) -> bool {
        let age = (now - entry.timestamp).num_milliseconds() as f64 / 1000.0;
        age >= self.window_seconds
    }

    fn purge_stale(&mut self, resource: &str, now: DateTime<Utc>) {
        let window = self.window_seconds;
        if let Some(buffer) = self.buffers.get_mut(resource) {
            while let Some(front) = buffer.front() {
                let age = (now - front.timestamp).num_milliseconds() as f64 / 1000.0;
                if age >= window {
                    buffer.pop_front();
                } else {
                    break;
                }
            }
        }
    }

    /// Log one access attempt against a node.
    ///
    /// The threat score compounds with the observer's history:
    /// `base(op) * (1 + cumulative/10)`, clamped to [0, 1]. Stale entries
    /// are purged both before and after the insert.
    pub fn record_observation(
        &mut self,
        observer: &str,
        op: Operation,
        resource: &str,
        details: Option<&str>,
        now: DateTime<Utc>,
    ) -> ObservationLog {
        self.purge_stale(resource, now);

        let history = self.cumulative.get(observer).copied().unwrap_or(0.0);
        let score = (op.base_threat_score() * (1.0 + history / 10.0)).clamp(0.0, 1.0);
        let entry = ObservationLog::new(observer, op, resource, now, score, details);

        self.buffers
            .entry(resource.to_string())
            .or_default()
            .push_back(entry.clone());
        *self.cumulative.entry(observer.to_string()).or_insert(0.0) += score;

        self.purge_stale(resource, now);
        entry
    }

    pub fn count_in_window(&self, resource: &str, now: DateTime<Utc>) -> usize {
        self.buffers
            .get(resource)
            .map(|b| b.iter().filter(|e| !self.is_stale(e, now)).count())
            .unwrap_or(0)
    }

    /// Observations per second over the node's live window.
    pub fn observation_rate(&self, resource: &str, now: DateTime<Utc>) -> f64 {
        self.count_in_window(resource, now) as f64 / self.window_seconds
    }

    /// Timestamp of the oldest entry still inside the window, if any.
    /// Drives retry-after hints for throttled callers.
    pub fn oldest_in_window(&self, resource: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.buffers
            .get(resource)?
            .iter()
            .find(|e| !self.is_stale(e, now))
            .map(|e| e.timestamp)
    }

    /// Score the node's live window for hostile patterns.
    ///
    /// A window rate above the alarm threshold contributes 0.5. Every
    /// observation of a sensitive operation (Export, Debug, Admin) whose
    /// in-window count exceeds the sensitive threshold contributes 0.3, so
    /// a flooded sensitive operation trips the detector on its own even
    /// when no single observer is individually flagged.
    pub fn detect_anomaly(&self, resource: &str, now: DateTime<Utc>) -> AnomalyReading {
        let rate = self.observation_rate(resource, now);
        let mut score = 0.0;
        if rate > self.rate_alarm_per_sec {
            score += 0.5;
        }

        for op in Operation::SENSITIVE {
            let count = self
                .buffers
                .get(resource)
                .map(|b| {
                    b.iter()
                        .filter(|e| e.operation == op && !self.is_stale(e, now))
                        .count()
                })
                .unwrap_or(0);
            if count > self.sensitive_count_threshold {
                score += 0.3 * count as f64;
            }
        }

        AnomalyReading {
            rate_per_sec: rate,
            anomaly_score: score,
            is_anomaly: score > self.anomaly_score_threshold,
        }
    }

    /// Running cumulative threat for one observer. Monotonically
    /// non-decreasing for the process lifetime.
    pub fn cumulative_threat(&self, observer: &str) -> f64 {
        self.cumulative.get(observer).copied().unwrap_or(0.0)
    }

    pub fn observer_threat(&self, observer: &str) -> ThreatLevel {
        ThreatLevel::from_cumulative(self.cumulative_threat(observer))
    }
}
