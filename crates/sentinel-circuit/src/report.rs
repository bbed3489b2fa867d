use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use sentinel_core::{CircuitState, ThreatLevel};

/// Snapshot of one node's defensive posture.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub resource_id: String,
    pub circuit_state: CircuitState,
    pub threat_level: ThreatLevel,
    pub energy_level: f64,
    pub friction_coefficient: f64,
    pub observation_count: u64,
    pub accessible: bool,
    pub lock_until: Option<DateTime<Utc>>,
}

/// Full read-only view across all protected nodes.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub generated_at: DateTime<Utc>,
    pub nodes: Vec<NodeStatus>,
    pub state_counts: BTreeMap<String, usize>,
    pub threat_counts: BTreeMap<String, usize>,
    pub average_energy: f64,
}

/// Aggregated security posture with rule-based recommendations.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityReport {
    pub generated_at: DateTime<Utc>,
    pub state_counts: BTreeMap<String, usize>,
    pub threat_counts: BTreeMap<String, usize>,
    /// Nodes at High or Critical threat.
    pub high_risk_count: usize,
    pub frozen_count: usize,
    pub average_energy: f64,
    /// Max minus min energy across nodes; a wide spread means the
    /// defensive reserve is pooling in the wrong places.
    pub energy_spread: f64,
    pub recommendations: Vec<String>,
}

/// One observer's accumulated standing, for "why was I denied" queries.
#[derive(Debug, Clone, Serialize)]
pub struct ObserverProfile {
    pub observer_id: String,
    pub cumulative_score: f64,
    pub threat_level: ThreatLevel,
}
