//! Capture metrics: what happened to each raw string on its way to scoring.
//!
//! One `CaptureMetrics` is owned by one capture (before or after). Nothing is
//! shared across pages, so counters are plain integers.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureMetrics {
    /// Raw strings received from the capture
    raw: usize,

    /// Strings that were not valid UTF-8 but decoded with a fallback encoding
    decoded_with_fallback: usize,

    /// Strings that could not be decoded at all
    decode_failures: usize,

    /// Strings rejected by normalization (empty or out of length bounds)
    rejected: usize,

    /// Strings dropped as noise (no letters, too short)
    noise_dropped: usize,

    /// Strings dropped by ignore rules before pairing
    ignored_dropped: usize,
}

impl CaptureMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_raw(&mut self) {
        self.raw += 1;
    }

    pub fn record_fallback_decode(&mut self) {
        self.decoded_with_fallback += 1;
    }

    pub fn record_decode_failure(&mut self) {
        self.decode_failures += 1;
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    pub fn record_noise(&mut self) {
        self.noise_dropped += 1;
    }

    pub fn record_ignored(&mut self) {
        self.ignored_dropped += 1;
    }

    /// Strings that survived every stage.
    pub fn kept(&self) -> usize {
        self.raw.saturating_sub(
            self.decode_failures + self.rejected + self.noise_dropped + self.ignored_dropped,
        )
    }

    pub fn report(&self) -> MetricsReport {
        let kept = self.kept();
        let keep_rate = if self.raw > 0 {
            (kept as f64 / self.raw as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            raw: self.raw,
            decoded_with_fallback: self.decoded_with_fallback,
            decode_failures: self.decode_failures,
            rejected: self.rejected,
            noise_dropped: self.noise_dropped,
            ignored_dropped: self.ignored_dropped,
            kept,
            keep_rate,
        }
    }
}

/// Serializable snapshot of a capture's metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub raw: usize,
    pub decoded_with_fallback: usize,
    pub decode_failures: usize,
    pub rejected: usize,
    pub noise_dropped: usize,
    pub ignored_dropped: usize,
    pub kept: usize,

    /// Kept strings as a percentage of raw strings (0-100)
    pub keep_rate: f64,
}
