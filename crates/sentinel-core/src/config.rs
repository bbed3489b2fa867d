use serde::{Deserialize, Serialize};

/// Tunable constants for the protection circuit, injected at construction.
/// No global singleton: every component that needs a threshold receives it
/// from here.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CircuitConfig {
    pub window_seconds: f64,              // e.g. 60.0
    pub rate_alarm_per_sec: f64,          // e.g. 10.0
    pub sensitive_count_threshold: usize, // e.g. 5
    pub anomaly_score_threshold: f64,     // e.g. 0.5
    pub friction_step: f64,               // e.g. 0.2
    pub lock_seconds: i64,                // e.g. 300
    pub initial_energy: f64,              // e.g. 0.5
    pub default_entropy_threshold: f64,   // e.g. 0.5
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60.0,
            rate_alarm_per_sec: 10.0,
            sensitive_count_threshold: 5,
            anomaly_score_threshold: 0.5,
            friction_step: 0.2,
            lock_seconds: 300,
            initial_energy: 0.5,
            default_entropy_threshold: 0.5,
        }
    }
}
