use serde::{Deserialize, Serialize};

/// The closed set of operations an observer can attempt against a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Write,
    Query,
    Export,
    Debug,
    Admin,
}

impl Operation {
    /// Operations that exfiltrate or reshape state; flooding any of
    /// these is treated as hostile by the anomaly detector.
    pub const SENSITIVE: [Operation; 3] = [Operation::Export, Operation::Debug, Operation::Admin];

    /// Base danger estimate before the observer's history is factored in.
    pub fn base_threat_score(self) -> f64 {
        match self {
            Operation::Read => 0.1,
            Operation::Query => 0.2,
            Operation::Write => 0.3,
            Operation::Debug => 0.4,
            Operation::Export => 0.5,
            Operation::Admin => 0.6,
        }
    }

    /// Per-second throttle ceiling on a single node's observation rate.
    pub fn rate_ceiling_per_sec(self) -> f64 {
        match self {
            Operation::Read => 100.0,
            Operation::Write => 50.0,
            Operation::Query => 30.0,
            Operation::Export => 5.0,
            Operation::Debug => 10.0,
            Operation::Admin => 3.0,
        }
    }

    pub fn is_sensitive(self) -> bool {
        Self::SENSITIVE.contains(&self)
    }
}

/// Ordinal classification of an observer's accumulated threat score.
/// Levels only rise under escalation; only an explicit unfreeze resets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Map a cumulative score onto its ordinal band.
    pub fn from_cumulative(score: f64) -> Self {
        if score < 0.5 {
            ThreatLevel::None
        } else if score < 2.0 {
            ThreatLevel::Low
        } else if score < 5.0 {
            ThreatLevel::Medium
        } else if score < 10.0 {
            ThreatLevel::High
        } else {
            ThreatLevel::Critical
        }
    }

    /// One ordinal step up, saturating at Critical.
    pub fn escalated(self) -> Self {
        match self {
            ThreatLevel::None => ThreatLevel::Low,
            ThreatLevel::Low => ThreatLevel::Medium,
            ThreatLevel::Medium => ThreatLevel::High,
            ThreatLevel::High => ThreatLevel::Critical,
            ThreatLevel::Critical => ThreatLevel::Critical,
        }
    }
}

/// Discrete defensive posture of one protected node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, all checks apply but nothing is pre-denied.
    Open,
    /// Restricted; entered when escalation raises the node to High.
    HalfOpen,
    /// Fully denied; entered at Critical with a timed lock.
    Closed,
    /// Administrative quarantine, independent of measured threat.
    Frozen,
}
