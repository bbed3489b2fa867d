//! Contention tests: many callers hitting the same node at an escalation
//! boundary must produce exactly one state transition per threshold
//! crossing, and no recorded observation may be lost.

use std::sync::{Arc, Barrier};
use std::thread;

use anyhow::Result;

use sentinel_circuit::{DecisionReason, SelfProtectionCircuit};
use sentinel_core::{CircuitConfig, CircuitState, Operation, SystemClock, ThreatLevel};

fn circuit_with(n: usize) -> Arc<SelfProtectionCircuit> {
    let resources = (0..n).map(|i| format!("node-{i}")).collect();
    Arc::new(SelfProtectionCircuit::new(
        resources,
        CircuitConfig::default(),
        Arc::new(SystemClock),
    ))
}

#[test]
fn concurrent_escalations_are_serialized() -> Result<()> {
    let circuit = circuit_with(8);

    // Flag one observer by spamming Admin against a sacrificial node.
    for _ in 0..12 {
        let _ = circuit.request_access("prowler", "node-7", Operation::Admin)?;
    }
    assert!(circuit.observer_profile("prowler")?.threat_level >= ThreatLevel::High);

    // Four barrier-synchronized callers on a fresh node. Serialized under
    // the circuit lock, they walk the threat ladder exactly once:
    // None -> Low -> Medium -> High -> Critical.
    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));
    let mut handles = Vec::new();
    for _ in 0..workers {
        let circuit = Arc::clone(&circuit);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            circuit.request_access("prowler", "node-0", Operation::Read)
        }));
    }
    for handle in handles {
        let decision = handle.join().expect("worker thread")?;
        assert!(!decision.granted);
        assert!(matches!(
            decision.reason,
            DecisionReason::DeniedByThreat | DecisionReason::DeniedByState(_)
        ));
    }

    let status = circuit.node_status("node-0")?;
    assert_eq!(status.threat_level, ThreatLevel::Critical);
    assert_eq!(status.circuit_state, CircuitState::Closed);
    assert!(status.lock_until.is_some());

    // Exactly one friction step per escalation, none lost, none doubled.
    assert!((status.friction_coefficient - 0.8).abs() < 1e-9);
    Ok(())
}

#[test]
fn concurrent_grants_lose_no_observations() -> Result<()> {
    let circuit = circuit_with(4);

    let workers = 8;
    let per_worker = 5;
    let barrier = Arc::new(Barrier::new(workers));
    let mut handles = Vec::new();
    for w in 0..workers {
        let circuit = Arc::clone(&circuit);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || -> Result<()> {
            barrier.wait();
            for i in 0..per_worker {
                let observer = format!("reader-{w}-{i}");
                let decision = circuit.request_access(&observer, "node-1", Operation::Read)?;
                assert!(decision.granted);
            }
            Ok(())
        }));
    }
    for handle in handles {
        handle.join().expect("worker thread")?;
    }

    let status = circuit.node_status("node-1")?;
    assert_eq!(status.observation_count, (workers * per_worker) as u64);
    assert_eq!(status.circuit_state, CircuitState::Open);
    Ok(())
}
