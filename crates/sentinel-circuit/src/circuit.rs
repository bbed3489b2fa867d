//! The orchestrator. One mutex guards every piece of mutable state —
//! detector windows, node state machines, entropy filters — and every
//! check-then-act sequence runs entirely inside it, so two callers crossing
//! an escalation threshold at the same instant can never both observe
//! "accessible" and push a node past Critical twice. No I/O happens inside
//! the critical section; hold times stay bounded and short.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use sentinel_core::{
    CircuitConfig, CircuitError, CircuitState, Clock, EntropyFilter, EntropyReading,
    ObserverEffectDetector, Operation, ThreatLevel,
};

use crate::decision::{AccessDecision, DecisionReason};
use crate::energy::{neighbor_indices, EnergyOutcome};
use crate::node::NodeProtection;
use crate::report::{NodeStatus, ObserverProfile, SecurityReport, StatusSummary};

/// Id of the entropy filter that always exists.
pub const DEFAULT_FILTER: &str = "default";

struct CircuitInner {
    detector: ObserverEffectDetector,
    nodes: HashMap<String, NodeProtection>,
    /// Fixed topological order of the protected resources.
    index: Vec<String>,
    filters: HashMap<String, EntropyFilter>,
}

pub struct SelfProtectionCircuit {
    cfg: CircuitConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<CircuitInner>,
}

impl SelfProtectionCircuit {
    /// Build the circuit over a fixed set of protected resources. Nodes are
    /// created here and live for the process lifetime; nothing is ever
    /// added or destroyed afterwards.
    pub fn new(resource_ids: Vec<String>, cfg: CircuitConfig, clock: Arc<dyn Clock>) -> Self {
        let mut nodes = HashMap::new();
        for (i, id) in resource_ids.iter().enumerate() {
            nodes.insert(id.clone(), NodeProtection::new(id, i, cfg.initial_energy));
        }
        let mut filters = HashMap::new();
        filters.insert(
            DEFAULT_FILTER.to_string(),
            EntropyFilter::new(DEFAULT_FILTER, cfg.default_entropy_threshold),
        );
        Self {
            inner: Mutex::new(CircuitInner {
                detector: ObserverEffectDetector::new(&cfg),
                nodes,
                index: resource_ids,
                filters,
            }),
            cfg,
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CircuitInner>, CircuitError> {
        self.inner.lock().map_err(|_| CircuitError::LockPoisoned)
    }

    fn escalate_node(&self, node: &mut NodeProtection, trigger: &str, now: DateTime<Utc>) {
        node.escalate(
            self.cfg.friction_step,
            now,
            Duration::seconds(self.cfg.lock_seconds),
        );
        warn!(
            resource = %node.resource_id,
            trigger,
            threat = ?node.threat_level,
            state = ?node.circuit_state,
            "protection escalated"
        );
    }

    /// Decide one access attempt. The whole read-decide-mutate sequence
    /// holds the circuit lock.
    pub fn request_access(
        &self,
        observer: &str,
        resource: &str,
        op: Operation,
    ) -> Result<AccessDecision, CircuitError> {
        let now = self.clock.now();
        let mut inner = self.lock()?;
        let CircuitInner {
            detector, nodes, ..
        } = &mut *inner;

        // 1. Unknown resources are reported, never silently created.
        let Some(node) = nodes.get_mut(resource) else {
            return Ok(AccessDecision::deny(DecisionReason::NotFound));
        };

        // 2. Current posture gates before anything else.
        if !node.is_accessible(now) {
            let retry_after_secs = node
                .lock_until
                .filter(|until| *until > now)
                .map(|until| ceil_secs(now, until));
            return Ok(AccessDecision {
                threat_level: Some(node.threat_level),
                retry_after_secs,
                ..AccessDecision::deny(DecisionReason::DeniedByState(node.circuit_state))
            });
        }

        // 3. Every attempt reaching an accessible node is logged, grants
        //    and denials alike, so the window stays a complete audit trail.
        let entry = detector.record_observation(observer, op, resource, None, now);
        node.observation_count += 1;
        node.last_observation = Some(now);

        // 4. Observers with heavy history are cut off and the node hardens.
        let observer_level = detector.observer_threat(observer);
        if observer_level >= ThreatLevel::High {
            self.escalate_node(node, "high_threat", now);
            return Ok(AccessDecision {
                threat_level: Some(observer_level),
                ..AccessDecision::deny(DecisionReason::DeniedByThreat)
            });
        }

        // 5. Hostile window patterns harden the node too.
        let anomaly = detector.detect_anomaly(resource, now);
        if anomaly.is_anomaly {
            self.escalate_node(node, "anomaly", now);
            return Ok(AccessDecision {
                anomaly_score: Some(anomaly.anomaly_score),
                threat_level: Some(node.threat_level),
                ..AccessDecision::deny(DecisionReason::DeniedByAnomaly)
            });
        }

        // 6. Per-operation ceilings are a pure throttle, no escalation.
        let rate = detector.observation_rate(resource, now);
        if rate > op.rate_ceiling_per_sec() {
            let retry_after_secs = detector
                .oldest_in_window(resource, now)
                .map(|oldest| {
                    let drains_at =
                        oldest + Duration::milliseconds((self.cfg.window_seconds * 1000.0) as i64);
                    ceil_secs(now, drains_at).max(1)
                })
                .or(Some(1));
            return Ok(AccessDecision {
                retry_after_secs,
                ..AccessDecision::deny(DecisionReason::RateLimited)
            });
        }

        // 7. Granted, with the node's current friction and a truncated
        //    correlation token.
        Ok(AccessDecision {
            granted: true,
            reason: DecisionReason::Granted,
            threat_level: Some(observer_level),
            anomaly_score: Some(anomaly.anomaly_score),
            retry_after_secs: None,
            friction: Some(node.friction_coefficient),
            token: Some(entry.correlation[..8].to_string()),
        })
    }

    /// Administrative quarantine: any state goes to Frozen for the supplied
    /// duration. Only `unfreeze_node` brings the node back.
    pub fn freeze_node(&self, resource: &str, duration_secs: i64) -> Result<(), CircuitError> {
        if duration_secs <= 0 {
            return Err(CircuitError::InvalidFreezeDuration(duration_secs));
        }
        let now = self.clock.now();
        let mut inner = self.lock()?;
        let node = inner
            .nodes
            .get_mut(resource)
            .ok_or_else(|| CircuitError::UnknownResource(resource.to_string()))?;
        node.freeze(now + Duration::seconds(duration_secs));
        warn!(resource, duration_secs, "node frozen");
        Ok(())
    }

    /// Administrative release: reopens the node, resets its threat level to
    /// None, and clears any timed lock, regardless of prior history.
    pub fn unfreeze_node(&self, resource: &str) -> Result<(), CircuitError> {
        let mut inner = self.lock()?;
        let node = inner
            .nodes
            .get_mut(resource)
            .ok_or_else(|| CircuitError::UnknownResource(resource.to_string()))?;
        node.unfreeze();
        info!(resource, "node unfrozen");
        Ok(())
    }

    /// Move `amount` of defensive energy from a source node, split evenly
    /// across its topological neighbors. Fails atomically: if the source
    /// lacks the energy or has no neighbors, nothing moves anywhere.
    pub fn distribute_energy(
        &self,
        source: &str,
        amount: f64,
    ) -> Result<EnergyOutcome, CircuitError> {
        if amount < 0.0 {
            return Err(CircuitError::NegativeAmount(amount));
        }
        let mut inner = self.lock()?;
        let space = inner.index.len();
        let (source_index, available) = {
            let node = inner
                .nodes
                .get(source)
                .ok_or_else(|| CircuitError::UnknownResource(source.to_string()))?;
            (node.index, node.energy_level)
        };

        let neighbors: Vec<String> = neighbor_indices(source_index, space)
            .into_iter()
            .map(|i| inner.index[i].clone())
            .collect();
        if neighbors.is_empty() {
            return Ok(EnergyOutcome::NoNeighbors);
        }
        if available < amount {
            return Ok(EnergyOutcome::InsufficientEnergy {
                available,
                requested: amount,
            });
        }

        let per_neighbor = amount / neighbors.len() as f64;
        if let Some(node) = inner.nodes.get_mut(source) {
            node.energy_level = (node.energy_level - amount).clamp(0.0, 1.0);
        }
        for id in &neighbors {
            if let Some(node) = inner.nodes.get_mut(id) {
                node.energy_level = (node.energy_level + per_neighbor).clamp(0.0, 1.0);
            }
        }
        info!(source, amount, fan_out = neighbors.len(), "energy distributed");
        Ok(EnergyOutcome::Distributed {
            per_neighbor,
            neighbors,
        })
    }

    /// Run a payload through a named entropy filter (the default one when
    /// no id is given). An unknown id is a contract violation.
    pub fn filter_by_entropy(
        &self,
        payload: &[u8],
        threshold: Option<f64>,
        filter_id: Option<&str>,
    ) -> Result<EntropyReading, CircuitError> {
        let id = filter_id.unwrap_or(DEFAULT_FILTER);
        let mut inner = self.lock()?;
        let filter = inner
            .filters
            .get_mut(id)
            .ok_or_else(|| CircuitError::UnknownFilter(id.to_string()))?;
        Ok(filter.apply(payload, threshold))
    }

    /// Register an additional named entropy filter.
    pub fn register_filter(&self, filter_id: &str, threshold: f64) -> Result<(), CircuitError> {
        let mut inner = self.lock()?;
        if inner.filters.contains_key(filter_id) {
            return Err(CircuitError::DuplicateFilter(filter_id.to_string()));
        }
        inner
            .filters
            .insert(filter_id.to_string(), EntropyFilter::new(filter_id, threshold));
        Ok(())
    }

    /// Toggle a filter. An inactive filter keeps counting payloads as
    /// passed without ever flagging them.
    pub fn set_filter_active(&self, filter_id: &str, active: bool) -> Result<(), CircuitError> {
        let mut inner = self.lock()?;
        let filter = inner
            .filters
            .get_mut(filter_id)
            .ok_or_else(|| CircuitError::UnknownFilter(filter_id.to_string()))?;
        filter.active = active;
        Ok(())
    }

    pub fn filter_status(&self, filter_id: &str) -> Result<EntropyFilter, CircuitError> {
        let inner = self.lock()?;
        inner
            .filters
            .get(filter_id)
            .cloned()
            .ok_or_else(|| CircuitError::UnknownFilter(filter_id.to_string()))
    }

    pub fn node_status(&self, resource: &str) -> Result<NodeStatus, CircuitError> {
        let now = self.clock.now();
        let inner = self.lock()?;
        inner
            .nodes
            .get(resource)
            .map(|node| status_of(node, now))
            .ok_or_else(|| CircuitError::UnknownResource(resource.to_string()))
    }

    /// Read-only view across every node, in topological order.
    pub fn get_all_status(&self) -> Result<StatusSummary, CircuitError> {
        let now = self.clock.now();
        let inner = self.lock()?;
        let nodes: Vec<NodeStatus> = inner
            .index
            .iter()
            .filter_map(|id| inner.nodes.get(id))
            .map(|node| status_of(node, now))
            .collect();

        let mut state_counts = std::collections::BTreeMap::new();
        let mut threat_counts = std::collections::BTreeMap::new();
        for status in &nodes {
            *state_counts
                .entry(format!("{:?}", status.circuit_state))
                .or_insert(0) += 1;
            *threat_counts
                .entry(format!("{:?}", status.threat_level))
                .or_insert(0) += 1;
        }
        let average_energy = if nodes.is_empty() {
            0.0
        } else {
            nodes.iter().map(|n| n.energy_level).sum::<f64>() / nodes.len() as f64
        };

        Ok(StatusSummary {
            generated_at: now,
            nodes,
            state_counts,
            threat_counts,
            average_energy,
        })
    }

    /// Aggregate posture plus rule-based recommendations.
    pub fn get_security_report(&self) -> Result<SecurityReport, CircuitError> {
        let summary = self.get_all_status()?;

        let high_risk_count = summary
            .nodes
            .iter()
            .filter(|n| n.threat_level >= ThreatLevel::High)
            .count();
        let frozen_count = summary
            .nodes
            .iter()
            .filter(|n| n.circuit_state == CircuitState::Frozen)
            .count();
        let energy_spread = match (
            summary
                .nodes
                .iter()
                .map(|n| n.energy_level)
                .fold(f64::INFINITY, f64::min),
            summary
                .nodes
                .iter()
                .map(|n| n.energy_level)
                .fold(f64::NEG_INFINITY, f64::max),
        ) {
            (min, max) if min.is_finite() && max.is_finite() => max - min,
            _ => 0.0,
        };

        let mut recommendations = Vec::new();
        if high_risk_count > 0 {
            recommendations.push(format!(
                "{high_risk_count} node(s) at High or Critical threat; review and unfreeze_node to recover"
            ));
        }
        if frozen_count > 0 {
            recommendations.push(format!("{frozen_count} node(s) under administrative quarantine"));
        }
        if energy_spread > 0.5 {
            recommendations.push(format!(
                "energy spread {energy_spread:.2} exceeds 0.5; rebalance with distribute_energy"
            ));
        }
        if recommendations.is_empty() {
            recommendations.push("no action required".to_string());
        }

        Ok(SecurityReport {
            generated_at: summary.generated_at,
            state_counts: summary.state_counts,
            threat_counts: summary.threat_counts,
            high_risk_count,
            frozen_count,
            average_energy: summary.average_energy,
            energy_spread,
            recommendations,
        })
    }

    /// One observer's accumulated standing.
    pub fn observer_profile(&self, observer: &str) -> Result<ObserverProfile, CircuitError> {
        let inner = self.lock()?;
        Ok(ObserverProfile {
            observer_id: observer.to_string(),
            cumulative_score: inner.detector.cumulative_threat(observer),
            threat_level: inner.detector.observer_threat(observer),
        })
    }
}

fn status_of(node: &NodeProtection, now: DateTime<Utc>) -> NodeStatus {
    NodeStatus {
        resource_id: node.resource_id.clone(),
        circuit_state: node.circuit_state,
        threat_level: node.threat_level,
        energy_level: node.energy_level,
        friction_coefficient: node.friction_coefficient,
        observation_count: node.observation_count,
        accessible: node.is_accessible(now),
        lock_until: node.lock_until,
    }
}

fn ceil_secs(from: DateTime<Utc>, until: DateTime<Utc>) -> i64 {
    let millis = (until - from).num_milliseconds();
    (millis + 999) / 1000
}
