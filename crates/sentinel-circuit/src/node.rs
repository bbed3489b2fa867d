use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use sentinel_core::{CircuitState, ThreatLevel};

/// Defensive state for one protected node. Created at init, never destroyed
/// for the process lifetime, and mutated only by the orchestrator while it
/// holds the circuit lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeProtection {
    pub resource_id: String,
    /// Position in the fixed resource index space; drives energy topology.
    pub index: usize,
    pub circuit_state: CircuitState,
    pub threat_level: ThreatLevel,
    pub energy_level: f64,
    pub friction_coefficient: f64,
    pub last_observation: Option<DateTime<Utc>>,
    pub observation_count: u64,
    pub lock_until: Option<DateTime<Utc>>,
}

impl NodeProtection {
    pub fn new(resource_id: &str, index: usize, initial_energy: f64) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            index,
            circuit_state: CircuitState::Open,
            threat_level: ThreatLevel::None,
            energy_level: initial_energy.clamp(0.0, 1.0),
            friction_coefficient: 0.0,
            last_observation: None,
            observation_count: 0,
            lock_until: None,
        }
    }

    /// A node is accessible when its state permits it AND no timed lock is
    /// still running. Passive expiry of the lock never restores a Closed or
    /// Frozen node; only an explicit unfreeze does.
    pub fn is_accessible(&self, now: DateTime<Utc>) -> bool {
        if matches!(
            self.circuit_state,
            CircuitState::Closed | CircuitState::Frozen
        ) {
            return false;
        }
        match self.lock_until {
            Some(until) => now >= until,
            None => true,
        }
    }

    /// One escalation step: friction rises by `friction_step` (capped at
    /// 1.0), the threat level advances one ordinal, and the circuit state
    /// follows the threat level. Critical closes the node under a timed
    /// lock; High restricts it to HalfOpen.
    pub fn escalate(&mut self, friction_step: f64, now: DateTime<Utc>, lock: Duration) {
        self.friction_coefficient = (self.friction_coefficient + friction_step).min(1.0);
        self.threat_level = self.threat_level.escalated();
        if self.threat_level >= ThreatLevel::Critical {
            self.circuit_state = CircuitState::Closed;
            self.lock_until = Some(now + lock);
        } else if self.threat_level >= ThreatLevel::High {
            self.circuit_state = CircuitState::HalfOpen;
        }
    }

    /// Administrative quarantine, independent of measured threat.
    pub fn freeze(&mut self, until: DateTime<Utc>) {
        self.circuit_state = CircuitState::Frozen;
        self.lock_until = Some(until);
    }

    /// Administrative release. Unconditionally reopens the node, resets the
    /// threat level to None, and clears any timed lock.
    pub fn unfreeze(&mut self) {
        self.circuit_state = CircuitState::Open;
        self.threat_level = ThreatLevel::None;
        self.lock_until = None;
    }
}
