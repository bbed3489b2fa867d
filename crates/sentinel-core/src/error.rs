use thiserror::Error;

/// Contract violations. Admission outcomes (deny, throttle, not-found) are
/// ordinary decision values, never errors; only misuse of the API fails fast.
#[derive(Debug, Error)]
pub enum CircuitError {
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("unknown entropy filter: {0}")]
    UnknownFilter(String),
    #[error("entropy filter already registered: {0}")]
    DuplicateFilter(String),
    #[error("energy amount must be non-negative (got {0})")]
    NegativeAmount(f64),
    #[error("freeze duration must be positive (got {0}s)")]
    InvalidFreezeDuration(i64),
    #[error("protection state lock poisoned by a panicking holder")]
    LockPoisoned,
}
