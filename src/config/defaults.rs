//! System-wide default constants.
//!
//! Centralises magic numbers used by the scanner, the feature extractor and
//! the scorer. Grouped by subsystem for easy discovery.

// ============================================================================
// Acquisition
// ============================================================================

/// Default front-end sample rate (Hz).
pub const SAMPLE_RATE_HZ: f64 = 2.048e6;

/// Samples read per frequency step. 256 Ki complex samples.
pub const SAMPLE_COUNT: usize = 256 * 1024;

/// Seconds to sleep between full sweeps of the frequency list.
pub const SCAN_INTERVAL_SECS: u64 = 10;

// ============================================================================
// Feature Extraction
// ============================================================================

/// Linear power floor applied before `10*log10` (-200 dB).
pub const POWER_FLOOR: f64 = 1e-20;

/// Peaks and occupied bandwidth are counted above `noise_floor + this` (dB).
pub const PEAK_THRESHOLD_DB: f64 = 6.0;

/// Fraction of cumulative linear power that defines spectral rolloff.
pub const ROLLOFF_FRACTION: f64 = 0.85;

/// Maximum number of peak frequencies reported per sample.
pub const MAX_REPORTED_PEAKS: usize = 10;

// ============================================================================
// Waterfall / Blobs
// ============================================================================

/// Bins kept per spectrum after downsampling.
pub const SPECTRUM_WIDTH: usize = 512;

/// Spectra retained per frequency in the waterfall.
pub const WATERFALL_CAPACITY: usize = 64;

/// Recommended waterfall capacity range. Values outside only warn.
pub const WATERFALL_CAPACITY_RANGE: (usize, usize) = (32, 64);

/// Complex samples kept in the raw snippet blob.
pub const RAW_SNIPPET_LEN: usize = 2048;

// ============================================================================
// Scoring
// ============================================================================

/// Local maxima above `noise_floor + this` count as interferers (dB).
pub const INTERFERENCE_THRESHOLD_DB: f64 = 3.0;

/// Interferer count at which `interference_level` saturates at 100.
pub const INTERFERENCE_SATURATION_PEAKS: usize = 5;

/// Spectra shorter than or equal to this report zero interference.
pub const INTERFERENCE_MIN_BINS: usize = 10;

/// Confidence reported when no baseline entry is available for comparison.
pub const DEFAULT_CONFIDENCE: f64 = 75.0;

/// Deviation (in the field's unit) at which out-of-tolerance confidence hits 0.
pub const MAX_DEVIATION: f64 = 20.0;

/// Dominant-frequency samples kept per frequency for the Doppler estimate.
pub const DRIFT_HISTORY_LEN: usize = 10;

/// Stability floor (kHz) in the activity-score denominator.
pub const ACTIVITY_STABILITY_FLOOR_KHZ: f64 = 0.1;

// ============================================================================
// Tolerances (fallback profile for unknown labels)
// ============================================================================

pub const DEFAULT_FREQ_TOL_HZ: f64 = 2_000.0;
pub const DEFAULT_BANDWIDTH_FRACTION: f64 = 0.10;
pub const DEFAULT_POWER_TOL_DB: f64 = 10.0;
pub const DEFAULT_NUM_PEAKS_TOL: u32 = 5;

// ============================================================================
// Storage
// ============================================================================

/// Default data directory (sled DB, lock file, baseline).
pub const DATA_DIR: &str = "./data";

/// sled database directory name inside the data directory.
pub const DETECTIONS_DB_NAME: &str = "detections.db";

/// Default baseline file path.
pub const BASELINE_PATH: &str = "./data/baseline.json";

/// Store attempts per detection before the record is dropped.
pub const PERSIST_RETRIES: u32 = 3;

/// Linear backoff step between store attempts (ms).
pub const PERSIST_RETRY_BACKOFF_MS: u64 = 50;

/// Baseline collection writes a checkpoint after this many entries.
pub const BASELINE_CHECKPOINT_EVERY: usize = 5;

// ============================================================================
// Device
// ============================================================================

pub const DEVICE_LABEL: &str = "sentinel-01";
