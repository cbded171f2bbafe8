//! Synthetic front-end: complex Gaussian noise plus CW carriers.
//!
//! Deterministic for a given seed, so baselines collected from it match
//! later sweeps within tolerance. Failure injection covers the error paths
//! of the scan loop without hardware.

use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use std::collections::HashSet;
use std::f64::consts::TAU;

use super::{DeviceError, FrontEnd, Tuning};
use crate::config::ScanTarget;
use crate::processing::{frequency_key, FrequencyKey};

/// Offset of generated carriers from their nominal frequency, so they do not
/// sit on the DC bin.
const CARRIER_OFFSET_HZ: f64 = 25_000.0;

/// A continuous-wave carrier visible whenever the tuned band covers it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emitter {
    pub frequency_hz: f64,
    /// Linear amplitude relative to unit noise std-dev
    pub amplitude: f32,
}

impl Emitter {
    pub fn new(frequency_hz: f64, amplitude: f32) -> Self {
        Self {
            frequency_hz,
            amplitude,
        }
    }
}

pub struct SyntheticFrontEnd {
    rng: StdRng,
    noise_std: f32,
    emitters: Vec<Emitter>,
    tuning: Option<Tuning>,
    failing: HashSet<FrequencyKey>,
    disconnect_after: Option<u64>,
    reads: u64,
}

impl SyntheticFrontEnd {
    pub fn new(seed: u64, noise_std: f32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            noise_std: noise_std.abs(),
            emitters: Vec::new(),
            tuning: None,
            failing: HashSet::new(),
            disconnect_after: None,
            reads: 0,
        }
    }

    /// One carrier slightly above each target frequency.
    pub fn from_targets(seed: u64, targets: &[ScanTarget]) -> Self {
        targets.iter().fold(Self::new(seed, 0.05), |fe, t| {
            fe.with_emitter(Emitter::new(t.frequency_hz + CARRIER_OFFSET_HZ, 0.5))
        })
    }

    #[must_use]
    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.emitters.push(emitter);
        self
    }

    /// Every `configure` at `frequency_hz` fails with a tuning error.
    #[must_use]
    pub fn failing_at(mut self, frequency_hz: f64) -> Self {
        self.failing.insert(frequency_key(frequency_hz));
        self
    }

    /// Reads after the first `reads` report the device as disconnected.
    #[must_use]
    pub fn disconnect_after(mut self, reads: u64) -> Self {
        self.disconnect_after = Some(reads);
        self
    }
}

impl FrontEnd for SyntheticFrontEnd {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn configure(&mut self, tuning: &Tuning) -> Result<(), DeviceError> {
        if self.failing.contains(&frequency_key(tuning.center_freq_hz)) {
            self.tuning = None;
            return Err(DeviceError::Tuning {
                frequency_hz: tuning.center_freq_hz,
                reason: "PLL not locked".to_string(),
            });
        }
        if !(tuning.sample_rate_hz.is_finite() && tuning.sample_rate_hz > 0.0) {
            return Err(DeviceError::Tuning {
                frequency_hz: tuning.center_freq_hz,
                reason: format!("unsupported sample rate {}", tuning.sample_rate_hz),
            });
        }
        self.tuning = Some(*tuning);
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read(&mut self, sample_count: usize) -> Result<Vec<Complex32>, DeviceError> {
        let tuning = self.tuning.ok_or(DeviceError::NotConfigured)?;
        if self.disconnect_after.is_some_and(|limit| self.reads >= limit) {
            return Err(DeviceError::Disconnected("synthetic device unplugged".to_string()));
        }
        self.reads += 1;

        let half_band = tuning.sample_rate_hz / 2.0;
        let visible: Vec<(f64, f32)> = self
            .emitters
            .iter()
            .map(|e| (e.frequency_hz - tuning.center_freq_hz, e.amplitude))
            .filter(|(offset, _)| offset.abs() < half_band)
            .map(|(offset, amp)| (TAU * offset / tuning.sample_rate_hz, amp))
            .collect();

        let mut samples = Vec::with_capacity(sample_count);
        for t in 0..sample_count {
            let re: f32 = StandardNormal.sample(&mut self.rng);
            let im: f32 = StandardNormal.sample(&mut self.rng);
            let mut sample = Complex32::new(re, im) * self.noise_std;
            for &(step, amp) in &visible {
                let phase = (step * t as f64) % TAU;
                sample += Complex32::from_polar(amp, phase as f32);
            }
            samples.push(sample);
        }
        Ok(samples)
    }
}
