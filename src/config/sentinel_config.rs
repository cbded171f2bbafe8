//! Sentinel Configuration - device identity, sweep plan, detection and storage tuning
//!
//! Every tunable the scanner uses is a field here. Each struct implements
//! `Default` from `config::defaults`, so a missing file behaves exactly like
//! the built-in constants.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::baseline::{builtin_profiles, ToleranceProfile};
use crate::processing::StatisticsKind;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "RF_SENTINEL_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "sentinel.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one sentinel deployment.
///
/// Load with `SentinelConfig::load()` which searches:
/// 1. `$RF_SENTINEL_CONFIG` env var
/// 2. `./sentinel.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SentinelConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub baseline: BaselineConfig,

    /// Per-label overrides merged over the built-in tolerance table
    #[serde(default)]
    pub tolerances: BTreeMap<String, ToleranceProfile>,

    /// Profile used for labels with no entry in `tolerances`
    #[serde(default)]
    pub default_tolerance: ToleranceProfile,
}

impl SentinelConfig {
    /// Load configuration using the standard search order:
    /// 1. `$RF_SENTINEL_CONFIG` environment variable
    /// 2. `./sentinel.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), device = %config.device.label, "Loaded config from RF_SENTINEL_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from RF_SENTINEL_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "RF_SENTINEL_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(device = %config.device.label, "Loaded config from ./sentinel.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./sentinel.toml, using defaults");
                }
            }
        }

        info!("No sentinel.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&contents)
            .map_err(|e| match e {
                ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
                other => other,
            })?;
        Ok(config)
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate ranges. Errors are fatal; suspicious values are logged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Built-in tolerance table with this config's overrides applied.
    pub fn tolerance_profiles(&self) -> BTreeMap<String, ToleranceProfile> {
        let mut profiles = builtin_profiles();
        for (label, profile) in &self.tolerances {
            profiles.insert(label.clone(), profile.clone());
        }
        profiles
    }

    /// sled directory for detection records.
    pub fn detections_db_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.detections_db)
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => write!(f, "Config parse error ({}): {}", path.display(), e),
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Device
// ============================================================================

/// Identity and tuning of the receiving station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_label")]
    pub label: String,

    #[serde(default)]
    pub latitude: f64,

    #[serde(default)]
    pub longitude: f64,

    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: f64,

    #[serde(default = "default_sample_count")]
    pub sample_count: usize,

    /// Manual gain in dB. Absent means automatic gain.
    #[serde(default)]
    pub gain_db: Option<f64>,
}

fn default_device_label() -> String { defaults::DEVICE_LABEL.to_string() }
fn default_sample_rate() -> f64 { defaults::SAMPLE_RATE_HZ }
fn default_sample_count() -> usize { defaults::SAMPLE_COUNT }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            label: default_device_label(),
            latitude: 0.0,
            longitude: 0.0,
            sample_rate_hz: default_sample_rate(),
            sample_count: default_sample_count(),
            gain_db: None,
        }
    }
}

// ============================================================================
// Scan
// ============================================================================

/// One entry of the sweep plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanTarget {
    pub frequency_hz: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Explicit sweep plan. Empty means "every baseline entry, in file order".
    #[serde(default)]
    pub frequencies: Vec<ScanTarget>,

    #[serde(default = "default_waterfall_capacity")]
    pub waterfall_capacity: usize,

    #[serde(default = "default_spectrum_width")]
    pub spectrum_width: usize,

    #[serde(default = "default_raw_snippet_len")]
    pub raw_snippet_len: usize,

    #[serde(default = "default_drift_history_len")]
    pub drift_history_len: usize,

    #[serde(default)]
    pub statistics: StatisticsKind,
}

fn default_interval() -> u64 { defaults::SCAN_INTERVAL_SECS }
fn default_waterfall_capacity() -> usize { defaults::WATERFALL_CAPACITY }
fn default_spectrum_width() -> usize { defaults::SPECTRUM_WIDTH }
fn default_raw_snippet_len() -> usize { defaults::RAW_SNIPPET_LEN }
fn default_drift_history_len() -> usize { defaults::DRIFT_HISTORY_LEN }

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            frequencies: Vec::new(),
            waterfall_capacity: default_waterfall_capacity(),
            spectrum_width: default_spectrum_width(),
            raw_snippet_len: default_raw_snippet_len(),
            drift_history_len: default_drift_history_len(),
            statistics: StatisticsKind::default(),
        }
    }
}

// ============================================================================
// Detection
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_peak_threshold")]
    pub peak_threshold_db: f64,

    #[serde(default = "default_interference_threshold")]
    pub interference_threshold_db: f64,

    #[serde(default = "default_interference_saturation")]
    pub interference_saturation_peaks: usize,

    #[serde(default = "default_rolloff")]
    pub rolloff_fraction: f64,

    #[serde(default = "default_max_peaks")]
    pub max_reported_peaks: usize,

    #[serde(default = "default_confidence")]
    pub default_confidence: f64,

    #[serde(default = "default_max_deviation")]
    pub max_deviation: f64,
}

fn default_peak_threshold() -> f64 { defaults::PEAK_THRESHOLD_DB }
fn default_interference_threshold() -> f64 { defaults::INTERFERENCE_THRESHOLD_DB }
fn default_interference_saturation() -> usize { defaults::INTERFERENCE_SATURATION_PEAKS }
fn default_rolloff() -> f64 { defaults::ROLLOFF_FRACTION }
fn default_max_peaks() -> usize { defaults::MAX_REPORTED_PEAKS }
fn default_confidence() -> f64 { defaults::DEFAULT_CONFIDENCE }
fn default_max_deviation() -> f64 { defaults::MAX_DEVIATION }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            peak_threshold_db: default_peak_threshold(),
            interference_threshold_db: default_interference_threshold(),
            interference_saturation_peaks: default_interference_saturation(),
            rolloff_fraction: default_rolloff(),
            max_reported_peaks: default_max_peaks(),
            default_confidence: default_confidence(),
            max_deviation: default_max_deviation(),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_detections_db")]
    pub detections_db: String,

    #[serde(default = "default_persist_retries")]
    pub persist_retries: u32,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

fn default_data_dir() -> PathBuf { PathBuf::from(defaults::DATA_DIR) }
fn default_detections_db() -> String { defaults::DETECTIONS_DB_NAME.to_string() }
fn default_persist_retries() -> u32 { defaults::PERSIST_RETRIES }
fn default_retry_backoff() -> u64 { defaults::PERSIST_RETRY_BACKOFF_MS }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            detections_db: default_detections_db(),
            persist_retries: default_persist_retries(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

// ============================================================================
// Baseline
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    #[serde(default = "default_baseline_path")]
    pub path: PathBuf,

    /// Collection writes a partial baseline after this many entries.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
}

fn default_baseline_path() -> PathBuf { PathBuf::from(defaults::BASELINE_PATH) }
fn default_checkpoint_every() -> usize { defaults::BASELINE_CHECKPOINT_EVERY }

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            path: default_baseline_path(),
            checkpoint_every: default_checkpoint_every(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = SentinelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.device.sample_count, 262_144);
        assert_eq!(config.scan.waterfall_capacity, 64);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = SentinelConfig::from_toml_str(
            r#"
[device]
label = "roof-north"
gain_db = 20.0

[scan]
interval_secs = 3
frequencies = [{ frequency_hz = 95e6, label = "wfm" }]
"#,
        )
        .unwrap();
        assert_eq!(config.device.label, "roof-north");
        assert_eq!(config.device.gain_db, Some(20.0));
        assert!((config.device.sample_rate_hz - 2.048e6).abs() < f64::EPSILON);
        assert_eq!(config.scan.interval_secs, 3);
        assert_eq!(config.scan.frequencies.len(), 1);
        assert_eq!(config.scan.frequencies[0].label, "wfm");
    }

    #[test]
    fn test_tolerance_override_replaces_builtin() {
        let config = SentinelConfig::from_toml_str(
            r#"
[tolerances.wfm]
freq_tol_hz = 500.0
"#,
        )
        .unwrap();
        let profiles = config.tolerance_profiles();
        assert!((profiles["wfm"].freq_tol_hz - 500.0).abs() < f64::EPSILON);
        // Untouched labels keep the built-in values
        assert!((profiles["walkie_pmr446"].freq_tol_hz - 15_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_sample_rate_rejected() {
        let err = SentinelConfig::from_toml_str("[device]\nsample_rate_hz = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_round_trip_toml() {
        let config = SentinelConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = SentinelConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.device.label, config.device.label);
    }
}
