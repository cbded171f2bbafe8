use serde::{Deserialize, Serialize};

/// Features derived from one `ScanSample`.
///
/// Fixed fields, computed once by the feature extractor and never mutated
/// afterwards. All scalars are finite: the extractor runs [`sanitize`] before
/// handing the value out.
///
/// [`sanitize`]: SpectralFeatures::sanitize
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralFeatures {
    /// Power spectrum in dB, FFT-shifted so index 0 is the most negative offset
    pub power_spectrum: Vec<f64>,

    // === Spectrum statistics (dB) ===
    pub peak_power_db: f64,
    /// Median of the power spectrum
    pub noise_floor_db: f64,
    pub mean_power_db: f64,
    pub std_power_db: f64,
    pub min_power_db: f64,
    pub max_power_db: f64,
    pub snr_db: f64,

    // === Shape of the spectrum distribution ===
    /// Excess kurtosis (0 for a normal distribution)
    pub kurtosis: f64,
    pub skewness: f64,

    // === Occupancy ===
    pub bandwidth_hz: f64,
    pub num_peaks: usize,

    // === Spectral shape (Hz offsets from center) ===
    pub spectral_centroid_hz: f64,
    pub spectral_rolloff_hz: f64,
    pub spectral_flux: f64,

    // === Time domain ===
    pub zero_crossing_rate: f64,
    pub phase_variance: f64,
    pub amplitude_variance: f64,
    pub modulation_index: f64,

    // === Peaks (Hz offsets from center) ===
    /// Up to ten strongest peaks, in ascending frequency order
    pub peak_frequencies_hz: Vec<f64>,
    pub dominant_frequency_hz: f64,
    /// Std-dev of all detected peak frequencies
    pub frequency_stability: f64,
}

impl SpectralFeatures {
    /// Replace any NaN or infinite value with 0.
    pub fn sanitize(&mut self) {
        for value in [
            &mut self.peak_power_db,
            &mut self.noise_floor_db,
            &mut self.mean_power_db,
            &mut self.std_power_db,
            &mut self.min_power_db,
            &mut self.max_power_db,
            &mut self.snr_db,
            &mut self.kurtosis,
            &mut self.skewness,
            &mut self.bandwidth_hz,
            &mut self.spectral_centroid_hz,
            &mut self.spectral_rolloff_hz,
            &mut self.spectral_flux,
            &mut self.zero_crossing_rate,
            &mut self.phase_variance,
            &mut self.amplitude_variance,
            &mut self.modulation_index,
            &mut self.dominant_frequency_hz,
            &mut self.frequency_stability,
        ] {
            *value = finite_or_zero(*value);
        }
        for value in self
            .power_spectrum
            .iter_mut()
            .chain(self.peak_frequencies_hz.iter_mut())
        {
            *value = finite_or_zero(*value);
        }
    }

    /// True when every scalar and every spectrum bin is finite.
    pub fn is_finite(&self) -> bool {
        [
            self.peak_power_db,
            self.noise_floor_db,
            self.mean_power_db,
            self.std_power_db,
            self.min_power_db,
            self.max_power_db,
            self.snr_db,
            self.kurtosis,
            self.skewness,
            self.bandwidth_hz,
            self.spectral_centroid_hz,
            self.spectral_rolloff_hz,
            self.spectral_flux,
            self.zero_crossing_rate,
            self.phase_variance,
            self.amplitude_variance,
            self.modulation_index,
            self.dominant_frequency_hz,
            self.frequency_stability,
        ]
        .iter()
        .chain(self.power_spectrum.iter())
        .chain(self.peak_frequencies_hz.iter())
        .all(|v| v.is_finite())
    }
}

#[inline]
pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
