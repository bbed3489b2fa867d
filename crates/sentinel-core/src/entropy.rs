//! Byte-distribution entropy filtering. High-entropy payloads (compressed,
//! encrypted, or packed data) moving through ordinary operations are a
//! common exfiltration tell.

use serde::{Deserialize, Serialize};

/// Shannon entropy of the payload's byte distribution, normalized to [0, 1]
/// by dividing out the 8-bit maximum. Empty payloads score 0.
pub fn shannon_entropy(payload: &[u8]) -> f64 {
    if payload.is_empty() {
        return 0.0;
    }
    let mut counts = [0usize; 256];
    for &b in payload {
        counts[b as usize] += 1;
    }
    let n = payload.len() as f64;
    let mut bits = 0.0;
    for &c in counts.iter() {
        if c > 0 {
            let p = c as f64 / n;
            bits -= p * p.log2();
        }
    }
    bits / 8.0
}

/// Result of running one payload through a filter.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EntropyReading {
    pub entropy: f64,
    pub threshold: f64,
    pub filtered: bool,
}

/// Stateful counter-based sampler. One default global filter exists; others
/// are addressable by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntropyFilter {
    pub filter_id: String,
    pub threshold: f64,
    pub active: bool,
    pub filtered_count: u64,
    pub passed_count: u64,
}

impl EntropyFilter {
    pub fn new(filter_id: &str, threshold: f64) -> Self {
        Self {
            filter_id: filter_id.to_string(),
            threshold,
            active: true,
            filtered_count: 0,
            passed_count: 0,
        }
    }

    /// Score a payload and update the filter's counters. A per-call
    /// threshold overrides the configured one without changing it. An
    /// inactive filter still reports entropy but never flags.
    pub fn apply(&mut self, payload: &[u8], threshold_override: Option<f64>) -> EntropyReading {
        let threshold = threshold_override.unwrap_or(self.threshold);
        let entropy = shannon_entropy(payload);
        let filtered = self.active && entropy > threshold;
        if filtered {
            self.filtered_count += 1;
        } else {
            self.passed_count += 1;
        }
        EntropyReading {
            entropy,
            threshold,
            filtered,
        }
    }
}
