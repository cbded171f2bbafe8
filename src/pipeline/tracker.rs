//! Per-signal history kept across scans: when a (frequency, label) was first
//! detected, and where its dominant peak has been sitting.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};

use crate::processing::{frequency_key, FrequencyKey, StatisticsBackend};
use crate::scoring::doppler_shift_estimate;

pub struct SignalTracker {
    first_detected: HashMap<(FrequencyKey, String), DateTime<Utc>>,
    dominant: HashMap<FrequencyKey, VecDeque<f64>>,
    history_len: usize,
    stats: Box<dyn StatisticsBackend>,
}

impl SignalTracker {
    pub fn new(history_len: usize, stats: Box<dyn StatisticsBackend>) -> Self {
        Self {
            first_detected: HashMap::new(),
            dominant: HashMap::new(),
            history_len: history_len.max(1),
            stats,
        }
    }

    /// Remember the absolute dominant frequency seen while tuned to
    /// `frequency_hz`, keeping the last `history_len` values.
    pub fn record_dominant(&mut self, frequency_hz: f64, dominant_abs_hz: f64) {
        let len = self.history_len;
        let history = self
            .dominant
            .entry(frequency_key(frequency_hz))
            .or_insert_with(|| VecDeque::with_capacity(len));
        if history.len() == len {
            history.pop_front();
        }
        history.push_back(dominant_abs_hz);
    }

    pub fn dominant_history(&self, frequency_hz: f64) -> Vec<f64> {
        self.dominant
            .get(&frequency_key(frequency_hz))
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Spread of the recorded dominant frequencies (Hz).
    pub fn doppler_estimate(&self, frequency_hz: f64) -> f64 {
        doppler_shift_estimate(&self.dominant_history(frequency_hz), self.stats.as_ref())
    }

    /// Seconds since this (frequency, label) was first detected. The first
    /// call registers `at` and returns 0.
    pub fn signal_duration(&mut self, frequency_hz: f64, label: &str, at: DateTime<Utc>) -> f64 {
        let first = *self
            .first_detected
            .entry((frequency_key(frequency_hz), label.to_string()))
            .or_insert(at);
        #[allow(clippy::cast_precision_loss)]
        let secs = (at - first).num_milliseconds() as f64 / 1000.0;
        secs.max(0.0)
    }
}
