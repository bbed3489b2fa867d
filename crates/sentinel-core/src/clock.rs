use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Time source for window arithmetic and lock expiry.
///
/// Injected so that the detector and circuit never reach for the system
/// clock directly; tests drive time through [`ManualClock`].
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time. The production default.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().expect("manual clock lock");
        *now += Duration::seconds(secs);
    }

    pub fn advance_millis(&self, millis: i64) {
        let mut now = self.now.lock().expect("manual clock lock");
        *now += Duration::milliseconds(millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("manual clock lock")
    }
}
