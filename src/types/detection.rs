use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SpectralFeatures;

/// Binary payloads attached to a detection.
///
/// Layouts (all little-endian):
/// - `power_spectrum`: float32 per bin, downsampled spectrum
/// - `raw_samples`: interleaved float32 real/imag pairs
/// - `waterfall`: row-major float32, `waterfall_rows` rows of equal width
/// - `peak_frequencies`: float32 Hz offsets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionBlobs {
    pub power_spectrum: Vec<u8>,
    pub raw_samples: Vec<u8>,
    pub waterfall: Option<Vec<u8>>,
    pub peak_frequencies: Vec<u8>,
}

/// Where and by whom a detection was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Immutable record of one anomalous scan step.
///
/// Scalar fields serialize as JSON metadata; `blobs` are stored separately
/// by the persistence backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub timestamp: DateTime<Utc>,
    pub frequency_hz: f64,
    pub label: String,
    pub device: DeviceIdentity,

    // === Spectral features ===
    pub bandwidth_hz: f64,
    pub peak_power_db: f64,
    pub noise_floor_db: f64,
    pub snr_db: f64,
    pub mean_power_db: f64,
    pub std_power_db: f64,
    pub min_power_db: f64,
    pub max_power_db: f64,
    pub kurtosis: f64,
    pub skewness: f64,
    pub num_peaks: usize,
    pub spectral_centroid_hz: f64,
    pub spectral_rolloff_hz: f64,
    pub spectral_flux: f64,
    pub zero_crossing_rate: f64,
    pub phase_variance: f64,
    pub amplitude_variance: f64,
    pub modulation_index: f64,
    pub dominant_frequency_hz: f64,
    pub frequency_stability: f64,

    // === Scores ===
    pub confidence_score: f64,
    pub signal_quality_index: f64,
    pub interference_level: f64,
    pub baseline_deviation: f64,
    pub bandwidth_efficiency: f64,
    pub doppler_shift_estimate: f64,
    pub activity_score: f64,

    // === Bookkeeping ===
    pub scan_number: u64,
    pub detection_sequence: u64,
    pub signal_duration_s: f64,
    /// Rows in the waterfall blob (0 when no snapshot was attached)
    pub waterfall_rows: usize,

    #[serde(skip)]
    pub blobs: DetectionBlobs,
}

impl DetectionRecord {
    /// Copy every scalar feature into a record shell.
    ///
    /// Scores and bookkeeping start at zero and are filled in by the caller.
    pub fn from_features(
        timestamp: DateTime<Utc>,
        frequency_hz: f64,
        label: &str,
        device: DeviceIdentity,
        features: &SpectralFeatures,
    ) -> Self {
        Self {
            timestamp,
            frequency_hz,
            label: label.to_string(),
            device,
            bandwidth_hz: features.bandwidth_hz,
            peak_power_db: features.peak_power_db,
            noise_floor_db: features.noise_floor_db,
            snr_db: features.snr_db,
            mean_power_db: features.mean_power_db,
            std_power_db: features.std_power_db,
            min_power_db: features.min_power_db,
            max_power_db: features.max_power_db,
            kurtosis: features.kurtosis,
            skewness: features.skewness,
            num_peaks: features.num_peaks,
            spectral_centroid_hz: features.spectral_centroid_hz,
            spectral_rolloff_hz: features.spectral_rolloff_hz,
            spectral_flux: features.spectral_flux,
            zero_crossing_rate: features.zero_crossing_rate,
            phase_variance: features.phase_variance,
            amplitude_variance: features.amplitude_variance,
            modulation_index: features.modulation_index,
            dominant_frequency_hz: features.dominant_frequency_hz,
            frequency_stability: features.frequency_stability,
            confidence_score: 0.0,
            signal_quality_index: 0.0,
            interference_level: 0.0,
            baseline_deviation: 0.0,
            bandwidth_efficiency: 0.0,
            doppler_shift_estimate: 0.0,
            activity_score: 0.0,
            scan_number: 0,
            detection_sequence: 0,
            signal_duration_s: 0.0,
            waterfall_rows: 0,
            blobs: DetectionBlobs::default(),
        }
    }
}
