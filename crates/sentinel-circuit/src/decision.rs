use serde::Serialize;

use sentinel_core::{CircuitState, ThreatLevel};

/// Why a decision came out the way it did. Every admission outcome is an
/// ordinary value; nothing here is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Granted,
    /// The resource id names nothing under protection.
    NotFound,
    /// The node's circuit state forbids access outright; recovery is
    /// administrative, no retry is implied.
    DeniedByState(CircuitState),
    /// The observer's cumulative threat crossed the High band.
    DeniedByThreat,
    /// The node's live window scored as anomalous.
    DeniedByAnomaly,
    /// Pure throttle; the caller may retry after the hinted delay.
    RateLimited,
}

/// Grant-or-deny verdict for one access attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AccessDecision {
    pub granted: bool,
    pub reason: DecisionReason,
    pub threat_level: Option<ThreatLevel>,
    pub anomaly_score: Option<f64>,
    pub retry_after_secs: Option<i64>,
    pub friction: Option<f64>,
    /// Truncated correlation token, only present on grants.
    pub token: Option<String>,
}

impl AccessDecision {
    pub fn deny(reason: DecisionReason) -> Self {
        Self {
            granted: false,
            reason,
            threat_level: None,
            anomaly_score: None,
            retry_after_secs: None,
            friction: None,
            token: None,
        }
    }
}
