//! Quality & confidence scoring for detections
//!
//! Every score is a pure function of the measured features, the reference
//! baseline entry (if any) and the resolved tolerances. Results are always
//! finite; scores documented as percentages stay in [0, 100].

use crate::baseline::{BaselineEntry, ResolvedTolerance};
use crate::config::{defaults, DetectionConfig};
use crate::processing::{local_maxima, StatisticsBackend};
use crate::types::SpectralFeatures;

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringSettings {
    /// Overall confidence when there is no baseline entry to compare with
    pub default_confidence: f64,
    /// Deviation (in the field's own unit) at which out-of-tolerance
    /// confidence reaches zero
    pub max_deviation: f64,
    pub interference_threshold_db: f64,
    pub interference_saturation_peaks: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            default_confidence: defaults::DEFAULT_CONFIDENCE,
            max_deviation: defaults::MAX_DEVIATION,
            interference_threshold_db: defaults::INTERFERENCE_THRESHOLD_DB,
            interference_saturation_peaks: defaults::INTERFERENCE_SATURATION_PEAKS,
        }
    }
}

impl From<&DetectionConfig> for ScoringSettings {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            default_confidence: config.default_confidence,
            max_deviation: config.max_deviation,
            interference_threshold_db: config.interference_threshold_db,
            interference_saturation_peaks: config.interference_saturation_peaks,
        }
    }
}

// ============================================================================
// Individual scores
// ============================================================================

/// Confidence (0-100) that `measured` agrees with `baseline`.
///
/// - no baseline value: 100
/// - within tolerance: `100 - dev/tol * 50` (100 down to 50)
/// - outside: `50 - min(dev/max_dev, 1) * 50` (50 down to 0)
///
/// A non-positive tolerance only accepts an exact match.
pub fn confidence(measured: f64, baseline: Option<f64>, tolerance: f64, max_deviation: f64) -> f64 {
    let Some(expected) = baseline else {
        return 100.0;
    };
    let dev = (measured - expected).abs();
    if !dev.is_finite() {
        return 0.0;
    }

    if tolerance > 0.0 && dev <= tolerance {
        return (100.0 - dev / tolerance * 50.0).clamp(50.0, 100.0);
    }
    if tolerance <= 0.0 && dev == 0.0 {
        return 100.0;
    }

    let scaled = if max_deviation > 0.0 {
        (dev / max_deviation).min(1.0)
    } else {
        1.0
    };
    (50.0 - scaled * 50.0).clamp(0.0, 50.0)
}

/// Mean confidence over peak power, SNR and bandwidth, or the configured
/// default when there is no reference entry.
pub fn overall_confidence(
    features: &SpectralFeatures,
    entry: Option<&BaselineEntry>,
    tolerance: &ResolvedTolerance,
    settings: &ScoringSettings,
) -> f64 {
    let Some(entry) = entry else {
        return settings.default_confidence;
    };
    let max_dev = settings.max_deviation;
    let scores = [
        confidence(features.peak_power_db, entry.peak_power_db, tolerance.peak_power_tol_db, max_dev),
        confidence(features.snr_db, entry.snr_db, tolerance.snr_tol_db, max_dev),
        confidence(features.bandwidth_hz, entry.bandwidth_hz, tolerance.bandwidth_tol_hz, max_dev),
    ];
    scores.iter().sum::<f64>() / 3.0
}

/// Power above the floor per decade of occupied bandwidth.
///
/// 0 when the bandwidth is at most 1 Hz.
pub fn bandwidth_efficiency(features: &SpectralFeatures) -> f64 {
    let decades = features.bandwidth_hz.max(1.0).log10();
    if decades <= 0.0 {
        return 0.0;
    }
    finite((features.peak_power_db - features.noise_floor_db) / decades)
}

/// Weighted blend of SNR (40), bandwidth efficiency (30) and frequency
/// stability (30).
pub fn signal_quality_index(features: &SpectralFeatures, bandwidth_efficiency: f64) -> f64 {
    let snr_term = (features.snr_db / 20.0).clamp(0.0, 1.0) * 40.0;
    let bw_term = (bandwidth_efficiency / 10.0).clamp(0.0, 1.0) * 30.0;
    let stability_term = (1.0 - features.frequency_stability / 1000.0).clamp(0.0, 1.0) * 30.0;
    finite(snr_term + bw_term + stability_term)
}

/// Crowding of the spectrum (0-100): local maxima above
/// `noise_floor + threshold`, saturating at `saturation_peaks`.
pub fn interference_level(
    spectrum: &[f64],
    noise_floor_db: f64,
    threshold_db: f64,
    saturation_peaks: usize,
) -> f64 {
    if spectrum.len() <= defaults::INTERFERENCE_MIN_BINS || saturation_peaks == 0 {
        return 0.0;
    }
    let peaks = local_maxima(spectrum, noise_floor_db + threshold_db).len();
    #[allow(clippy::cast_precision_loss)]
    let ratio = peaks as f64 / saturation_peaks as f64;
    ratio.min(1.0) * 100.0
}

/// How strongly and steadily the emitter is transmitting (0-100).
pub fn activity_score(features: &SpectralFeatures) -> f64 {
    let stability_khz = (features.frequency_stability / 1000.0).max(defaults::ACTIVITY_STABILITY_FLOOR_KHZ);
    finite((features.snr_db / 10.0) / stability_khz).clamp(0.0, 100.0)
}

/// Mean of |peak power deviation| (dB) and |bandwidth deviation| (kHz)
/// over whichever of the two the reference entry carries; 0 when neither.
pub fn baseline_deviation(features: &SpectralFeatures, entry: Option<&BaselineEntry>) -> f64 {
    let Some(entry) = entry else {
        return 0.0;
    };
    let terms: Vec<f64> = [
        entry.peak_power_db.map(|p| (features.peak_power_db - p).abs()),
        entry.bandwidth_hz.map(|b| (features.bandwidth_hz - b).abs() / 1000.0),
    ]
    .into_iter()
    .flatten()
    .collect();
    if terms.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = terms.len() as f64;
    finite(terms.iter().sum::<f64>() / count)
}

/// Spread (Hz) of recent dominant frequencies; 0 with fewer than two.
pub fn doppler_shift_estimate(history: &[f64], stats: &dyn StatisticsBackend) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }
    finite(stats.std_dev(history))
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

// ============================================================================
// Combined report
// ============================================================================

/// All per-detection scores except the drift estimate, which needs history.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QualityReport {
    pub confidence_score: f64,
    pub signal_quality_index: f64,
    pub interference_level: f64,
    pub baseline_deviation: f64,
    pub bandwidth_efficiency: f64,
    pub activity_score: f64,
}

impl QualityReport {
    pub fn compute(
        features: &SpectralFeatures,
        entry: Option<&BaselineEntry>,
        tolerance: &ResolvedTolerance,
        settings: &ScoringSettings,
    ) -> Self {
        let bandwidth_efficiency = bandwidth_efficiency(features);
        Self {
            confidence_score: overall_confidence(features, entry, tolerance, settings),
            signal_quality_index: signal_quality_index(features, bandwidth_efficiency),
            interference_level: interference_level(
                &features.power_spectrum,
                features.noise_floor_db,
                settings.interference_threshold_db,
                settings.interference_saturation_peaks,
            ),
            baseline_deviation: baseline_deviation(features, entry),
            bandwidth_efficiency,
            activity_score: activity_score(features),
        }
    }
}
