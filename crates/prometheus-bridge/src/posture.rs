use crate::metrics::CircuitMetrics;
use sentinel_circuit::SecurityReport;

/// Gate for automation acting on the circuit (rollouts, bulk unfreezes):
/// publish the new posture and report whether risk grew across the step.
pub fn reject_if_risk_increases(
    metrics: &CircuitMetrics,
    before: &SecurityReport,
    after: &SecurityReport,
) -> bool {
    metrics.observe_report(after);
    after.high_risk_count > before.high_risk_count
}
