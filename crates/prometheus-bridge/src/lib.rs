//! Read-only Prometheus export of the protection circuit's posture.
//! Dashboards scrape these gauges; nothing here feeds back into decisions.

pub mod metrics;
pub mod posture;

pub use metrics::CircuitMetrics;
pub use posture::reject_if_risk_increases;
