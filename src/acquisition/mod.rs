//! Radio front-end abstraction
//!
//! The scanner only needs two things from a receiver: tune to a frequency,
//! then hand back a block of complex baseband samples. Everything about the
//! physical device (USB transport, calibration, buffering) lives behind
//! [`FrontEnd`].
//!
//! - `SyntheticFrontEnd`: seeded noise plus configurable carriers
//! - `IqFileFrontEnd`: replays `.cf32` captures from a directory

mod iq_file;
mod synthetic;

pub use iq_file::IqFileFrontEnd;
pub use synthetic::{Emitter, SyntheticFrontEnd};

use num_complex::Complex32;
use thiserror::Error;

use crate::config::DeviceConfig;

/// Receiver gain setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gain {
    Auto,
    /// Manual gain in dB
    Manual(f64),
}

impl Gain {
    pub fn from_config(gain_db: Option<f64>) -> Self {
        gain_db.map_or(Self::Auto, Self::Manual)
    }
}

impl std::fmt::Display for Gain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Manual(db) => write!(f, "{db:.1} dB"),
        }
    }
}

/// Everything a front-end needs to tune for one scan step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub center_freq_hz: f64,
    pub sample_rate_hz: f64,
    pub gain: Gain,
}

impl Tuning {
    pub fn new(center_freq_hz: f64, device: &DeviceConfig) -> Self {
        Self {
            center_freq_hz,
            sample_rate_hz: device.sample_rate_hz,
            gain: Gain::from_config(device.gain_db),
        }
    }
}

/// Front-end failures.
///
/// Everything except [`DeviceError::Disconnected`] only costs the current
/// scan step.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("read before configure")]
    NotConfigured,

    #[error("cannot tune to {frequency_hz} Hz: {reason}")]
    Tuning { frequency_hz: f64, reason: String },

    #[error("sample read failed: {0}")]
    Read(String),

    #[error("short read: wanted {wanted} samples, got {got}")]
    ShortRead { wanted: usize, got: usize },

    #[error("device disconnected: {0}")]
    Disconnected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    /// True when no further acquisition is possible this run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Disconnected(_))
    }
}

/// A tunable source of complex baseband samples.
///
/// Calls are blocking and strictly sequential: `configure` then `read` for
/// each scan step.
pub trait FrontEnd: Send {
    /// Human-readable name for logging (e.g. "synthetic", "iq-file").
    fn name(&self) -> &str;

    fn configure(&mut self, tuning: &Tuning) -> Result<(), DeviceError>;

    /// Read exactly `sample_count` samples at the last configured tuning.
    fn read(&mut self, sample_count: usize) -> Result<Vec<Complex32>, DeviceError>;
}

impl<F: FrontEnd + ?Sized> FrontEnd for Box<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn configure(&mut self, tuning: &Tuning) -> Result<(), DeviceError> {
        (**self).configure(tuning)
    }

    fn read(&mut self, sample_count: usize) -> Result<Vec<Complex32>, DeviceError> {
        (**self).read(sample_count)
    }
}
