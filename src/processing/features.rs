//! Feature extraction: one block of I/Q in, one `SpectralFeatures` out.

use num_complex::Complex32;
use tracing::trace;

use super::fft::{shifted_bin_frequencies, SpectrumAnalyzer};
use super::peaks::PeakSet;
use super::statistics::{is_degenerate_spread, StatisticsBackend};
use crate::config::{defaults, DetectionConfig, SentinelConfig};
use crate::types::{ScanSample, SpectralFeatures};

/// Thresholds the extractor applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractorSettings {
    /// Peaks and occupied bins are counted above `noise_floor + this`
    pub peak_threshold_db: f64,
    pub rolloff_fraction: f64,
    pub max_reported_peaks: usize,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            peak_threshold_db: defaults::PEAK_THRESHOLD_DB,
            rolloff_fraction: defaults::ROLLOFF_FRACTION,
            max_reported_peaks: defaults::MAX_REPORTED_PEAKS,
        }
    }
}

impl From<&DetectionConfig> for ExtractorSettings {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            peak_threshold_db: config.peak_threshold_db,
            rolloff_fraction: config.rolloff_fraction,
            max_reported_peaks: config.max_reported_peaks,
        }
    }
}

/// Turns raw sample blocks into feature vectors.
///
/// Owns the FFT plan cache and the statistics backend chosen at startup.
pub struct FeatureExtractor {
    analyzer: SpectrumAnalyzer,
    stats: Box<dyn StatisticsBackend>,
    settings: ExtractorSettings,
}

impl FeatureExtractor {
    pub fn new(settings: ExtractorSettings, stats: Box<dyn StatisticsBackend>) -> Self {
        Self {
            analyzer: SpectrumAnalyzer::new(),
            stats,
            settings,
        }
    }

    pub fn from_config(config: &SentinelConfig) -> Self {
        Self {
            analyzer: SpectrumAnalyzer::with_size(config.device.sample_count),
            stats: config.scan.statistics.backend(),
            settings: ExtractorSettings::from(&config.detection),
        }
    }

    pub fn settings(&self) -> &ExtractorSettings {
        &self.settings
    }

    pub fn backend_name(&self) -> &'static str {
        self.stats.name()
    }

    pub fn extract_sample(&mut self, sample: &ScanSample) -> SpectralFeatures {
        self.extract(&sample.samples, sample.sample_rate_hz)
    }

    /// Full feature vector for one block.
    ///
    /// An empty block yields `SpectralFeatures::default()`. A block whose
    /// samples are all identical keeps its power spectrum but reports zero for
    /// every scalar.
    pub fn extract(&mut self, samples: &[Complex32], sample_rate_hz: f64) -> SpectralFeatures {
        let Some(&first) = samples.first() else {
            return SpectralFeatures::default();
        };

        let power_spectrum = self.analyzer.power_spectrum_db(samples);

        if samples.iter().all(|s| *s == first) {
            trace!(len = samples.len(), "constant block, scalar features zeroed");
            let mut features = SpectralFeatures {
                power_spectrum,
                ..SpectralFeatures::default()
            };
            features.sanitize();
            return features;
        }

        self.features_from_spectrum(power_spectrum, samples, sample_rate_hz)
    }

    /// Everything after the FFT: statistics, shape, time domain and peaks.
    ///
    /// `samples` feeds only the time-domain features and may be empty.
    pub fn features_from_spectrum(
        &self,
        power_spectrum: Vec<f64>,
        samples: &[Complex32],
        sample_rate_hz: f64,
    ) -> SpectralFeatures {
        if power_spectrum.is_empty() {
            return SpectralFeatures::default();
        }
        let stats = self.stats.as_ref();
        let spectrum = power_spectrum.as_slice();
        let n = spectrum.len();
        let bin_freqs = shifted_bin_frequencies(n, sample_rate_hz);

        // Distribution of the dB spectrum
        let peak_power_db = spectrum.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_power_db = spectrum.iter().copied().fold(f64::INFINITY, f64::min);
        let mean_power_db = stats.mean(spectrum);
        let std_power_db = stats.std_dev(spectrum);
        let noise_floor_db = stats.median(spectrum);
        let moments = stats.moments(spectrum);

        // Occupancy above the peak threshold
        let occupied_threshold = noise_floor_db + self.settings.peak_threshold_db;
        let occupied = spectrum.iter().filter(|&&v| v > occupied_threshold).count();
        let bandwidth_hz = occupied as f64 * sample_rate_hz / n as f64;

        // Shape over linear power
        let linear: Vec<f64> = spectrum.iter().map(|db| 10f64.powf(db / 10.0)).collect();
        let total_power: f64 = linear.iter().sum();
        let (spectral_centroid_hz, spectral_rolloff_hz) = if total_power > 0.0 {
            let centroid = linear
                .iter()
                .zip(&bin_freqs)
                .map(|(p, f)| p * f)
                .sum::<f64>()
                / total_power;
            (
                centroid,
                rolloff_frequency(&linear, &bin_freqs, total_power, self.settings.rolloff_fraction),
            )
        } else {
            (0.0, 0.0)
        };
        let spectral_flux: f64 = spectrum.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();

        // Peaks: one set feeds count, list, dominant and stability
        let peaks = PeakSet::detect(spectrum, occupied_threshold, self.settings.max_reported_peaks);
        let peak_frequencies_hz: Vec<f64> = peaks.reported.iter().map(|&i| bin_freqs[i]).collect();
        let dominant_frequency_hz = peaks.dominant.map_or(0.0, |i| bin_freqs[i]);
        let frequency_stability = if peaks.len() > 1 {
            let all: Vec<f64> = peaks.all.iter().map(|&i| bin_freqs[i]).collect();
            stats.std_dev(&all)
        } else {
            0.0
        };

        let time = time_domain(samples, stats);

        let mut features = SpectralFeatures {
            peak_power_db,
            noise_floor_db,
            mean_power_db,
            std_power_db,
            min_power_db,
            max_power_db: peak_power_db,
            snr_db: peak_power_db - noise_floor_db,
            kurtosis: moments.kurtosis,
            skewness: moments.skewness,
            bandwidth_hz,
            num_peaks: peaks.len(),
            spectral_centroid_hz,
            spectral_rolloff_hz,
            spectral_flux,
            zero_crossing_rate: time.zero_crossing_rate,
            phase_variance: time.phase_variance,
            amplitude_variance: time.amplitude_variance,
            modulation_index: time.modulation_index,
            peak_frequencies_hz,
            dominant_frequency_hz,
            frequency_stability,
            power_spectrum,
        };
        features.sanitize();
        features
    }
}

/// First bin frequency where cumulative linear power reaches `fraction` of the total.
fn rolloff_frequency(linear: &[f64], bin_freqs: &[f64], total: f64, fraction: f64) -> f64 {
    let target = fraction * total;
    let mut cumulative = 0.0;
    for (p, f) in linear.iter().zip(bin_freqs) {
        cumulative += p;
        if cumulative >= target {
            return *f;
        }
    }
    bin_freqs.last().copied().unwrap_or(0.0)
}

#[derive(Debug, Default)]
struct TimeDomain {
    zero_crossing_rate: f64,
    phase_variance: f64,
    amplitude_variance: f64,
    modulation_index: f64,
}

fn time_domain(samples: &[Complex32], stats: &dyn StatisticsBackend) -> TimeDomain {
    if samples.is_empty() {
        return TimeDomain::default();
    }

    let crossings = samples
        .windows(2)
        .filter(|w| sign(w[0].re) != sign(w[1].re))
        .count();

    let phases: Vec<f64> = samples.iter().map(|s| f64::from(s.im.atan2(s.re))).collect();
    let amplitudes: Vec<f64> = samples.iter().map(|s| f64::from(s.norm())).collect();

    let amp_mean = stats.mean(&amplitudes);
    let amp_std = stats.std_dev(&amplitudes);
    let modulation_index = if is_degenerate_spread(amp_std, amp_mean) {
        0.0
    } else {
        let normalized: Vec<f64> = amplitudes.iter().map(|a| (a - amp_mean) / amp_std).collect();
        stats.std_dev(&normalized)
    };

    TimeDomain {
        zero_crossing_rate: crossings as f64 / samples.len() as f64,
        phase_variance: stats.variance(&phases),
        amplitude_variance: amp_std * amp_std,
        modulation_index,
    }
}

fn sign(x: f32) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::StatisticsKind;
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::{Distribution, Normal};

    fn extractor(kind: StatisticsKind) -> FeatureExtractor {
        FeatureExtractor::new(ExtractorSettings::default(), kind.backend())
    }

    fn noisy_tone(n: usize, bin: usize, amplitude: f32, seed: u64) -> Vec<Complex32> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0f32, 0.05).unwrap();
        (0..n)
            .map(|t| {
                let phase = 2.0 * std::f32::consts::PI * bin as f32 * t as f32 / n as f32;
                Complex32::new(
                    amplitude * phase.cos() + noise.sample(&mut rng),
                    amplitude * phase.sin() + noise.sample(&mut rng),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_block_is_default() {
        let features = extractor(StatisticsKind::Statrs).extract(&[], 2.048e6);
        assert_eq!(features, SpectralFeatures::default());
    }

    #[test]
    fn test_all_zero_block_has_zero_scalars() {
        let features =
            extractor(StatisticsKind::Statrs).extract(&vec![Complex32::new(0.0, 0.0); 1024], 2.048e6);
        assert_eq!(features.kurtosis, 0.0);
        assert_eq!(features.skewness, 0.0);
        assert_eq!(features.modulation_index, 0.0);
        assert_eq!(features.frequency_stability, 0.0);
        assert_eq!(features.power_spectrum.len(), 1024);
        assert!(features.is_finite());
    }

    #[test]
    fn test_constant_amplitude_block_has_zero_scalars() {
        let features =
            extractor(StatisticsKind::Native).extract(&vec![Complex32::new(0.3, -0.3); 256], 1.0e6);
        assert_eq!(features.kurtosis, 0.0);
        assert_eq!(features.modulation_index, 0.0);
        assert_eq!(features.num_peaks, 0);
        assert!(features.is_finite());
    }

    #[test]
    fn test_single_peak_over_flat_floor() {
        let mut spectrum = vec![-100.0; 1024];
        spectrum[700] = -70.0;
        let features = extractor(StatisticsKind::Statrs).features_from_spectrum(spectrum, &[], 1.024e6);
        assert_eq!(features.num_peaks, 1);
        assert_eq!(features.frequency_stability, 0.0);
        assert!((features.noise_floor_db + 100.0).abs() < 1e-9);
        assert!((features.snr_db - 30.0).abs() < 1e-9);
        // One occupied bin at 1 kHz resolution
        assert!((features.bandwidth_hz - 1_000.0).abs() < 1e-6);
        // Bin 700 sits 188 bins right of center
        assert!((features.dominant_frequency_hz - 188_000.0).abs() < 1e-6);
        assert_eq!(features.peak_frequencies_hz, vec![188_000.0]);

        let interference = crate::scoring::interference_level(
            &features.power_spectrum,
            features.noise_floor_db,
            defaults::INTERFERENCE_THRESHOLD_DB,
            defaults::INTERFERENCE_SATURATION_PEAKS,
        );
        assert!(interference <= 20.0, "interference {interference}");
    }

    #[test]
    fn test_tone_is_dominant_and_finite() {
        let n = 4096;
        let sr = 2.048e6;
        let features = extractor(StatisticsKind::Statrs).extract(&noisy_tone(n, 100, 1.0, 7), sr);
        assert!(features.is_finite());
        let expected = 100.0 * sr / n as f64;
        assert!((features.dominant_frequency_hz - expected).abs() < 1e-6);
        assert!(features.snr_db > 30.0);
        assert!(features.num_peaks >= 1);
        assert!(features.peak_frequencies_hz.len() <= 10);
        assert!(features
            .peak_frequencies_hz
            .windows(2)
            .all(|w| w[0] < w[1]));
        assert!(features.zero_crossing_rate > 0.0);
    }

    #[test]
    fn test_backends_produce_matching_features() {
        let samples = noisy_tone(2048, 40, 0.5, 11);
        let a = extractor(StatisticsKind::Statrs).extract(&samples, 1.0e6);
        let b = extractor(StatisticsKind::Native).extract(&samples, 1.0e6);
        assert!((a.noise_floor_db - b.noise_floor_db).abs() < 1e-9);
        assert!((a.std_power_db - b.std_power_db).abs() < 1e-9);
        assert_eq!(a.num_peaks, b.num_peaks);
    }

    #[test]
    fn test_non_finite_samples_are_sanitized() {
        let mut samples = noisy_tone(512, 10, 1.0, 3);
        samples[5] = Complex32::new(f32::NAN, f32::INFINITY);
        let features = extractor(StatisticsKind::Native).extract(&samples, 1.0e6);
        assert!(features.is_finite());
    }

    #[test]
    fn test_zero_crossing_rate_counts_sign_changes() {
        let samples = [1.0, -1.0, 1.0, -1.0]
            .iter()
            .map(|&re| Complex32::new(re, 0.5))
            .collect::<Vec<_>>();
        let features = extractor(StatisticsKind::Native).extract(&samples, 4.0);
        assert!((features.zero_crossing_rate - 0.75).abs() < 1e-12);
    }
}
