use std::sync::Arc;

use chrono::{TimeZone, Utc};

use sentinel_core::{CircuitConfig, CircuitError, CircuitState, ManualClock, Operation, ThreatLevel};

use crate::circuit::{SelfProtectionCircuit, DEFAULT_FILTER};
use crate::decision::DecisionReason;
use crate::energy::EnergyOutcome;

fn epoch() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn circuit_with(n: usize) -> (Arc<ManualClock>, SelfProtectionCircuit) {
    let clock = Arc::new(ManualClock::starting_at(epoch()));
    let resources = (0..n).map(|i| format!("node-{i}")).collect();
    let circuit = SelfProtectionCircuit::new(resources, CircuitConfig::default(), clock.clone());
    (clock, circuit)
}

/// Drive one observer's cumulative score past the High band by spamming
/// Admin operations against a sacrificial node.
fn flag_observer(circuit: &SelfProtectionCircuit, observer: &str, resource: &str) {
    for _ in 0..12 {
        let _ = circuit
            .request_access(observer, resource, Operation::Admin)
            .expect("access call");
    }
    let profile = circuit.observer_profile(observer).expect("profile");
    assert!(profile.threat_level >= ThreatLevel::High);
}

#[test]
fn unknown_resource_is_not_found_and_inert() {
    let (_clock, circuit) = circuit_with(3);

    let decision = circuit
        .request_access("drifter", "ghost", Operation::Read)
        .expect("access call");
    assert!(!decision.granted);
    assert_eq!(decision.reason, DecisionReason::NotFound);

    // Nothing was recorded anywhere.
    let profile = circuit.observer_profile("drifter").expect("profile");
    assert!((profile.cumulative_score).abs() < 1e-12);
    let summary = circuit.get_all_status().expect("status");
    assert!(summary.nodes.iter().all(|n| n.observation_count == 0));
}

#[test]
fn grant_carries_friction_and_truncated_token() {
    let (_clock, circuit) = circuit_with(3);

    let decision = circuit
        .request_access("visitor", "node-0", Operation::Read)
        .expect("access call");
    assert!(decision.granted);
    assert_eq!(decision.reason, DecisionReason::Granted);
    assert_eq!(decision.friction, Some(0.0));
    assert_eq!(decision.token.as_deref().map(str::len), Some(8));
    assert_eq!(decision.threat_level, Some(ThreatLevel::None));
}

#[test]
fn flagged_observer_is_denied_and_the_node_hardens() {
    let (_clock, circuit) = circuit_with(3);
    flag_observer(&circuit, "prowler", "node-1");

    let decision = circuit
        .request_access("prowler", "node-0", Operation::Read)
        .expect("access call");
    assert!(!decision.granted);
    assert_eq!(decision.reason, DecisionReason::DeniedByThreat);
    assert!(decision.threat_level.unwrap() >= ThreatLevel::High);

    let status = circuit.node_status("node-0").expect("status");
    assert_eq!(status.threat_level, ThreatLevel::Low);
    assert!((status.friction_coefficient - 0.2).abs() < 1e-9);

    // The denied attempt is still on the audit trail.
    assert_eq!(status.observation_count, 1);
}

#[test]
fn closed_node_stays_denied_after_lock_expiry_until_unfreeze() {
    let (clock, circuit) = circuit_with(3);
    flag_observer(&circuit, "prowler", "node-1");

    // Four threat denials walk node-0 from None up to Critical.
    for _ in 0..4 {
        let decision = circuit
            .request_access("prowler", "node-0", Operation::Read)
            .expect("access call");
        assert!(!decision.granted);
    }
    let status = circuit.node_status("node-0").expect("status");
    assert_eq!(status.circuit_state, CircuitState::Closed);
    assert_eq!(status.threat_level, ThreatLevel::Critical);
    assert!(status.lock_until.is_some());

    // Lock expiry alone never reopens a Closed node, for any observer.
    clock.advance_secs(301);
    let decision = circuit
        .request_access("innocent", "node-0", Operation::Read)
        .expect("access call");
    assert_eq!(
        decision.reason,
        DecisionReason::DeniedByState(CircuitState::Closed)
    );

    circuit.unfreeze_node("node-0").expect("unfreeze");
    let status = circuit.node_status("node-0").expect("status");
    assert_eq!(status.circuit_state, CircuitState::Open);
    assert_eq!(status.threat_level, ThreatLevel::None);
    assert!(status.lock_until.is_none());

    // Fresh observers get in again; the flagged one stays flagged because
    // the accumulator never decays.
    let fresh = circuit
        .request_access("innocent", "node-0", Operation::Read)
        .expect("access call");
    assert!(fresh.granted);
    let stale = circuit
        .request_access("prowler", "node-0", Operation::Read)
        .expect("access call");
    assert_eq!(stale.reason, DecisionReason::DeniedByThreat);
}

#[test]
fn freeze_then_unfreeze_restores_defaults() {
    let (clock, circuit) = circuit_with(3);

    circuit.freeze_node("node-2", 600).expect("freeze");
    let status = circuit.node_status("node-2").expect("status");
    assert_eq!(status.circuit_state, CircuitState::Frozen);
    assert!(!status.accessible);

    // Even past the supplied duration the quarantine holds.
    clock.advance_secs(700);
    let decision = circuit
        .request_access("visitor", "node-2", Operation::Read)
        .expect("access call");
    assert_eq!(
        decision.reason,
        DecisionReason::DeniedByState(CircuitState::Frozen)
    );

    circuit.unfreeze_node("node-2").expect("unfreeze");
    let status = circuit.node_status("node-2").expect("status");
    assert_eq!(status.circuit_state, CircuitState::Open);
    assert_eq!(status.threat_level, ThreatLevel::None);
    assert!(status.lock_until.is_none());
    assert!(status.accessible);
}

#[test]
fn freeze_contract_violations_fail_fast() {
    let (_clock, circuit) = circuit_with(3);
    assert!(matches!(
        circuit.freeze_node("node-0", 0),
        Err(CircuitError::InvalidFreezeDuration(0))
    ));
    assert!(matches!(
        circuit.freeze_node("ghost", 60),
        Err(CircuitError::UnknownResource(_))
    ));
    assert!(matches!(
        circuit.unfreeze_node("ghost"),
        Err(CircuitError::UnknownResource(_))
    ));
}

#[test]
fn rate_ceiling_is_a_pure_throttle() {
    let (_clock, circuit) = circuit_with(3);

    // Query allows 30/s over the 60s window; call 1801 tips past it.
    for i in 0..1800 {
        let observer = format!("q-{i}");
        let decision = circuit
            .request_access(&observer, "node-0", Operation::Query)
            .expect("access call");
        assert!(decision.granted, "call {i} should pass");
    }
    let throttled = circuit
        .request_access("q-last", "node-0", Operation::Query)
        .expect("access call");
    assert!(!throttled.granted);
    assert_eq!(throttled.reason, DecisionReason::RateLimited);
    assert!(throttled.retry_after_secs.unwrap() >= 1);

    // No escalation happened: throttling leaves the posture untouched.
    let status = circuit.node_status("node-0").expect("status");
    assert_eq!(status.circuit_state, CircuitState::Open);
    assert_eq!(status.threat_level, ThreatLevel::None);
    assert!((status.friction_coefficient).abs() < 1e-12);
}

#[test]
fn six_exports_from_six_observers_trip_the_anomaly_path() {
    let (_clock, circuit) = circuit_with(3);

    for i in 0..5 {
        let observer = format!("courier-{i}");
        let decision = circuit
            .request_access(&observer, "node-0", Operation::Export)
            .expect("access call");
        assert!(decision.granted);
    }
    let sixth = circuit
        .request_access("courier-5", "node-0", Operation::Export)
        .expect("access call");
    assert!(!sixth.granted);
    assert_eq!(sixth.reason, DecisionReason::DeniedByAnomaly);
    assert!(sixth.anomaly_score.unwrap() > 0.5);

    // No single courier is individually flagged.
    for i in 0..6 {
        let profile = circuit
            .observer_profile(&format!("courier-{i}"))
            .expect("profile");
        assert!(profile.threat_level < ThreatLevel::High);
    }

    let status = circuit.node_status("node-0").expect("status");
    assert_eq!(status.threat_level, ThreatLevel::Low);
}

#[test]
fn energy_distribution_is_atomic_on_failure() {
    let (_clock, circuit) = circuit_with(8);

    let outcome = circuit.distribute_energy("node-0", 0.9).expect("distribute");
    assert_eq!(
        outcome,
        EnergyOutcome::InsufficientEnergy {
            available: 0.5,
            requested: 0.9
        }
    );
    let summary = circuit.get_all_status().expect("status");
    assert!(summary
        .nodes
        .iter()
        .all(|n| (n.energy_level - 0.5).abs() < 1e-12));
}

#[test]
fn energy_moves_evenly_to_index_neighbors() {
    let (_clock, circuit) = circuit_with(8);

    // node-0 neighbors +1 and +6 only; -1 and -6 fall off the index space.
    let outcome = circuit.distribute_energy("node-0", 0.4).expect("distribute");
    match outcome {
        EnergyOutcome::Distributed {
            per_neighbor,
            neighbors,
        } => {
            assert!((per_neighbor - 0.2).abs() < 1e-12);
            assert_eq!(neighbors, vec!["node-1".to_string(), "node-6".to_string()]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let status = circuit.get_all_status().expect("status");
    let energy = |id: &str| {
        status
            .nodes
            .iter()
            .find(|n| n.resource_id == id)
            .map(|n| n.energy_level)
            .expect("node present")
    };
    assert!((energy("node-0") - 0.1).abs() < 1e-9);
    assert!((energy("node-1") - 0.7).abs() < 1e-9);
    assert!((energy("node-6") - 0.7).abs() < 1e-9);
    assert!((energy("node-3") - 0.5).abs() < 1e-12);
}

#[test]
fn energy_contract_violations_fail_fast() {
    let (_clock, circuit) = circuit_with(8);
    assert!(matches!(
        circuit.distribute_energy("node-0", -0.1),
        Err(CircuitError::NegativeAmount(_))
    ));
    assert!(matches!(
        circuit.distribute_energy("ghost", 0.1),
        Err(CircuitError::UnknownResource(_))
    ));
}

#[test]
fn lone_node_has_no_neighbors() {
    let (_clock, circuit) = circuit_with(1);
    let outcome = circuit.distribute_energy("node-0", 0.1).expect("distribute");
    assert_eq!(outcome, EnergyOutcome::NoNeighbors);
    let status = circuit.node_status("node-0").expect("status");
    assert!((status.energy_level - 0.5).abs() < 1e-12);
}

#[test]
fn entropy_filters_are_addressable_by_id() {
    let (_clock, circuit) = circuit_with(2);

    let zeros = vec![0u8; 512];
    let reading = circuit
        .filter_by_entropy(&zeros, None, None)
        .expect("default filter");
    assert!(!reading.filtered);
    assert!((reading.entropy).abs() < 1e-12);

    circuit.register_filter("strict", 0.1).expect("register");
    let text = b"plain ascii prose has middling entropy";
    let strict = circuit
        .filter_by_entropy(text, None, Some("strict"))
        .expect("strict filter");
    assert!(strict.filtered);

    circuit.set_filter_active("strict", false).expect("toggle");
    let muted = circuit
        .filter_by_entropy(text, None, Some("strict"))
        .expect("strict filter");
    assert!(!muted.filtered);

    let state = circuit.filter_status("strict").expect("status");
    assert_eq!(state.filtered_count, 1);
    assert_eq!(state.passed_count, 1);

    assert!(matches!(
        circuit.filter_by_entropy(&zeros, None, Some("ghost")),
        Err(CircuitError::UnknownFilter(_))
    ));
    assert!(matches!(
        circuit.register_filter(DEFAULT_FILTER, 0.5),
        Err(CircuitError::DuplicateFilter(_))
    ));
}

#[test]
fn security_report_recommendations_follow_the_rules() {
    let (_clock, circuit) = circuit_with(8);

    let quiet = circuit.get_security_report().expect("report");
    assert_eq!(quiet.high_risk_count, 0);
    assert!((quiet.energy_spread).abs() < 1e-12);
    assert_eq!(quiet.recommendations, vec!["no action required".to_string()]);

    // Skew the energy field and harden one node.
    circuit.distribute_energy("node-0", 0.4).expect("distribute");
    flag_observer(&circuit, "prowler", "node-7");

    let loud = circuit.get_security_report().expect("report");
    assert!(loud.high_risk_count >= 1);
    assert!(loud.energy_spread > 0.5);
    assert!(loud
        .recommendations
        .iter()
        .any(|r| r.contains("High or Critical")));
    assert!(loud.recommendations.iter().any(|r| r.contains("energy spread")));

    circuit.freeze_node("node-3", 120).expect("freeze");
    let frozen = circuit.get_security_report().expect("report");
    assert!(frozen
        .recommendations
        .iter()
        .any(|r| r.contains("quarantine")));
    assert_eq!(frozen.frozen_count, 1);
}

#[test]
fn decisions_serialize_for_dashboards() {
    let (_clock, circuit) = circuit_with(2);
    let decision = circuit
        .request_access("visitor", "node-0", Operation::Read)
        .expect("access call");

    let json = serde_json::to_value(&decision).expect("serialize");
    assert_eq!(json["granted"], serde_json::json!(true));
    assert_eq!(json["reason"], serde_json::json!("granted"));
    assert_eq!(json["threat_level"], serde_json::json!("none"));

    let report = circuit.get_security_report().expect("report");
    let json = serde_json::to_value(&report).expect("serialize");
    assert!(json["recommendations"].is_array());
}

#[test]
fn status_summary_counts_cover_every_node() {
    let (_clock, circuit) = circuit_with(5);
    circuit.freeze_node("node-4", 60).expect("freeze");

    let summary = circuit.get_all_status().expect("status");
    assert_eq!(summary.nodes.len(), 5);
    assert_eq!(summary.state_counts.values().sum::<usize>(), 5);
    assert_eq!(summary.threat_counts.values().sum::<usize>(), 5);
    assert_eq!(summary.state_counts.get("Frozen"), Some(&1));
    assert!((summary.average_energy - 0.5).abs() < 1e-12);
}
