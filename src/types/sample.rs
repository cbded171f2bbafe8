use chrono::{DateTime, Utc};
use num_complex::Complex32;

/// One block of complex baseband samples captured at a tuned frequency.
///
/// Owned by the orchestrator for the duration of a single scan step.
#[derive(Debug, Clone)]
pub struct ScanSample {
    /// Tuned center frequency (Hz)
    pub frequency_hz: f64,
    /// Emission label this frequency is scanned under
    pub label: String,
    /// Raw I/Q values as returned by the front-end
    pub samples: Vec<Complex32>,
    pub sample_rate_hz: f64,
    pub timestamp: DateTime<Utc>,
}

impl ScanSample {
    pub fn new(
        frequency_hz: f64,
        label: impl Into<String>,
        samples: Vec<Complex32>,
        sample_rate_hz: f64,
    ) -> Self {
        Self {
            frequency_hz,
            label: label.into(),
            samples,
            sample_rate_hz,
            timestamp: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The first `len` samples, used for the raw-snippet blob.
    pub fn snippet(&self, len: usize) -> &[Complex32] {
        &self.samples[..self.samples.len().min(len)]
    }
}
