//! Rolling per-frequency history of downsampled power spectra.

use std::collections::{HashMap, VecDeque};

use super::fft::downsample;

/// Map key for a tuned frequency: the value rounded to whole Hz.
pub type FrequencyKey = u64;

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn frequency_key(frequency_hz: f64) -> FrequencyKey {
    frequency_hz.max(0.0).round() as u64
}

/// Bounded FIFO of recent spectra for each scanned frequency.
///
/// Spectra are downsampled to `width` bins on the way in; each frequency
/// keeps at most `capacity` rows and evicts the oldest on overflow.
#[derive(Debug, Clone)]
pub struct WaterfallBuffer {
    capacity: usize,
    width: usize,
    history: HashMap<FrequencyKey, VecDeque<Vec<f32>>>,
}

impl WaterfallBuffer {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize, width: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            width,
            history: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, frequency_hz: f64, spectrum: &[f64]) {
        let row = downsample(spectrum, self.width);
        let rows = self
            .history
            .entry(frequency_key(frequency_hz))
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        if rows.len() == self.capacity {
            rows.pop_front();
        }
        rows.push_back(row);
    }

    /// Oldest-first copy of the history, or empty with fewer than two rows.
    pub fn snapshot(&self, frequency_hz: f64) -> Vec<Vec<f32>> {
        match self.history.get(&frequency_key(frequency_hz)) {
            Some(rows) if rows.len() >= 2 => rows.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn len(&self, frequency_hz: f64) -> usize {
        self.history
            .get(&frequency_key(frequency_hz))
            .map_or(0, VecDeque::len)
    }

    /// Number of frequencies with any history.
    pub fn tracked_frequencies(&self) -> usize {
        self.history.len()
    }
}
