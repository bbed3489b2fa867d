//! Self-protection circuit for a fixed set of shared protected nodes.
//!
//! Responsibilities:
//! - Gate every access attempt through live, time-windowed telemetry.
//! - Escalate a node's defensive posture autonomously, from open access
//!   up to full lockout, with no human in the loop.
//! - Keep check-then-act decision sequences atomic under contention: no
//!   double-escalation, no lost escalation.
//! - Diffuse defensive energy between topological neighbor nodes and
//!   produce read-only security reports for external dashboards.

pub mod circuit;
pub mod decision;
pub mod energy;
pub mod node;
pub mod report;

pub use circuit::{SelfProtectionCircuit, DEFAULT_FILTER};
pub use decision::{AccessDecision, DecisionReason};
pub use energy::{neighbor_indices, EnergyOutcome};
pub use node::NodeProtection;
pub use report::{NodeStatus, ObserverProfile, SecurityReport, StatusSummary};

#[cfg(test)]
mod tests;
