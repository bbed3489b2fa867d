pub mod clock;
pub mod config;
pub mod detector;
pub mod entropy;
pub mod error;
pub mod observation;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CircuitConfig;
pub use detector::{AnomalyReading, ObserverEffectDetector};
pub use entropy::{shannon_entropy, EntropyFilter, EntropyReading};
pub use error::CircuitError;
pub use observation::ObservationLog;
pub use types::{CircuitState, Operation, ThreatLevel};
