use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Operation;

/// Immutable record of one access attempt and its derived threat score.
/// Lives only inside a node's time-window buffer; purged once it ages past
/// the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationLog {
    pub observer_id: String,
    pub operation: Operation,
    pub resource_id: String,
    pub timestamp: DateTime<Utc>,
    pub threat_score: f64,
    /// Opaque correlation token for tracing a decision back to its attempt.
    pub correlation: String,
    pub details: Option<String>,
}

impl ObservationLog {
    pub fn new(
        observer_id: &str,
        operation: Operation,
        resource_id: &str,
        timestamp: DateTime<Utc>,
        threat_score: f64,
        details: Option<&str>,
    ) -> Self {
        Self {
            observer_id: observer_id.to_string(),
            operation,
            resource_id: resource_id.to_string(),
            timestamp,
            threat_score,
            correlation: Uuid::new_v4().simple().to_string(),
            details: details.map(str::to_string),
        }
    }
}
