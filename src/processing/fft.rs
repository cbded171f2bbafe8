//! Power spectrum computation using rustfft
//!
//! Plans are cached per transform length so repeated sweeps at a fixed
//! `sample_count` reuse the same twiddle tables.

use num_complex::{Complex, Complex32};
use rustfft::{Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::defaults::POWER_FLOOR;

/// FFT engine producing shifted dB power spectra.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f64>,
    plans: HashMap<usize, Arc<dyn Fft<f64>>>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            plans: HashMap::new(),
        }
    }

    /// Create an analyzer with the plan for `len` already built.
    pub fn with_size(len: usize) -> Self {
        let mut analyzer = Self::new();
        if len > 0 {
            analyzer.plan(len);
        }
        analyzer
    }

    fn plan(&mut self, len: usize) -> Arc<dyn Fft<f64>> {
        let planner = &mut self.planner;
        Arc::clone(
            self.plans
                .entry(len)
                .or_insert_with(|| planner.plan_fft_forward(len)),
        )
    }

    /// `10*log10(|X|^2)` of the samples, FFT-shifted.
    ///
    /// Linear power is floored at `POWER_FLOOR` before the log so empty bins
    /// stay finite. Non-finite input samples are treated as 0.
    pub fn power_spectrum_db(&mut self, samples: &[Complex32]) -> Vec<f64> {
        let n = samples.len();
        if n == 0 {
            return Vec::new();
        }

        let mut buffer: Vec<Complex<f64>> = samples
            .iter()
            .map(|s| {
                let re = if s.re.is_finite() { f64::from(s.re) } else { 0.0 };
                let im = if s.im.is_finite() { f64::from(s.im) } else { 0.0 };
                Complex::new(re, im)
            })
            .collect();

        self.plan(n).process(&mut buffer);

        let mut spectrum: Vec<f64> = buffer
            .iter()
            .map(|c| 10.0 * c.norm_sqr().max(POWER_FLOOR).log10())
            .collect();
        fft_shift(&mut spectrum);
        spectrum
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Move the zero-frequency bin to the center (in place).
pub fn fft_shift<T>(values: &mut [T]) {
    let half = values.len() / 2;
    values.rotate_right(half);
}

/// Bin center frequencies (Hz offset from the tuned center) after `fft_shift`.
///
/// Bin `i` maps to `(i - n/2) * sample_rate / n`.
pub fn shifted_bin_frequencies(n: usize, sample_rate_hz: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let resolution = sample_rate_hz / n as f64;
    let half = (n / 2) as f64;
    (0..n).map(|i| (i as f64 - half) * resolution).collect()
}

/// Keep every `step`-th bin, `step = max(1, len / width)`, then cap at `width`.
#[allow(clippy::cast_possible_truncation)]
pub fn downsample(spectrum: &[f64], width: usize) -> Vec<f32> {
    if width == 0 {
        return Vec::new();
    }
    let step = (spectrum.len() / width).max(1);
    spectrum
        .iter()
        .step_by(step)
        .take(width)
        .map(|&v| v as f32)
        .collect()
}
