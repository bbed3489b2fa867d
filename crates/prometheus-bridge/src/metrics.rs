use prometheus::{register_gauge, register_gauge_vec, Gauge, GaugeVec};

use sentinel_circuit::{SecurityReport, StatusSummary};

pub struct CircuitMetrics {
    pub node_energy_level: GaugeVec,
    pub node_friction_coefficient: GaugeVec,
    pub node_accessible: GaugeVec,
    pub nodes_by_state: GaugeVec,
    pub nodes_by_threat: GaugeVec,
    pub high_risk_nodes: Gauge,
    pub average_energy: Gauge,
}

impl CircuitMetrics {
    pub fn new() -> Self {
        let node_energy_level = register_gauge_vec!(
            "sentinel_node_energy_level",
            "Defensive energy per protected node",
            &["resource"]
        )
        .unwrap();

        let node_friction_coefficient = register_gauge_vec!(
            "sentinel_node_friction_coefficient",
            "Access friction per protected node",
            &["resource"]
        )
        .unwrap();

        let node_accessible = register_gauge_vec!(
            "sentinel_node_accessible",
            "1 when the node currently admits access, else 0",
            &["resource"]
        )
        .unwrap();

        let nodes_by_state = register_gauge_vec!(
            "sentinel_nodes_by_state",
            "Node count per circuit state",
            &["state"]
        )
        .unwrap();

        let nodes_by_threat = register_gauge_vec!(
            "sentinel_nodes_by_threat",
            "Node count per threat level",
            &["threat"]
        )
        .unwrap();

        let high_risk_nodes = register_gauge!(
            "sentinel_high_risk_nodes",
            "Nodes at High or Critical threat"
        )
        .unwrap();

        let average_energy = register_gauge!(
            "sentinel_average_energy",
            "Mean defensive energy across all nodes"
        )
        .unwrap();

        Self {
            node_energy_level,
            node_friction_coefficient,
            node_accessible,
            nodes_by_state,
            nodes_by_threat,
            high_risk_nodes,
            average_energy,
        }
    }

    pub fn observe_status(&self, summary: &StatusSummary) {
        for node in &summary.nodes {
            self.node_energy_level
                .with_label_values(&[&node.resource_id])
                .set(node.energy_level);
            self.node_friction_coefficient
                .with_label_values(&[&node.resource_id])
                .set(node.friction_coefficient);
            self.node_accessible
                .with_label_values(&[&node.resource_id])
                .set(if node.accessible { 1.0 } else { 0.0 });
        }
        for (state, count) in &summary.state_counts {
            self.nodes_by_state
                .with_label_values(&[state])
                .set(*count as f64);
        }
        for (threat, count) in &summary.threat_counts {
            self.nodes_by_threat
                .with_label_values(&[threat])
                .set(*count as f64);
        }
    }

    pub fn observe_report(&self, report: &SecurityReport) {
        self.high_risk_nodes.set(report.high_risk_count as f64);
        self.average_energy.set(report.average_energy);
    }
}

impl Default for CircuitMetrics {
    fn default() -> Self {
        Self::new()
    }
}
