//! Replay front-end for recorded captures.
//!
//! Reads `<frequency_hz>.cf32` files (interleaved little-endian float32 I/Q,
//! the same layout as the raw-sample blob) from one directory. Each read
//! takes the next `sample_count` samples, wrapping to the start of the
//! capture when it runs out.

use num_complex::Complex32;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{DeviceError, FrontEnd, Tuning};
use crate::processing::{frequency_key, FrequencyKey};
use crate::storage::codec::decode_complex;

pub struct IqFileFrontEnd {
    dir: PathBuf,
    captures: HashMap<FrequencyKey, Capture>,
    current: Option<FrequencyKey>,
}

struct Capture {
    samples: Vec<Complex32>,
    cursor: usize,
}

impl IqFileFrontEnd {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            captures: HashMap::new(),
            current: None,
        }
    }

    /// Capture file expected for a frequency.
    pub fn capture_path(dir: &Path, frequency_hz: f64) -> PathBuf {
        dir.join(format!("{}.cf32", frequency_key(frequency_hz)))
    }

    fn load(&self, frequency_hz: f64) -> Result<Vec<Complex32>, DeviceError> {
        let path = Self::capture_path(&self.dir, frequency_hz);
        let bytes = std::fs::read(&path).map_err(|e| DeviceError::Tuning {
            frequency_hz,
            reason: format!("no capture at {}: {e}", path.display()),
        })?;
        let samples = decode_complex(&bytes).map_err(|e| DeviceError::Read(e.to_string()))?;
        debug!(path = %path.display(), samples = samples.len(), "Loaded capture");
        Ok(samples)
    }
}

impl FrontEnd for IqFileFrontEnd {
    fn name(&self) -> &str {
        "iq-file"
    }

    fn configure(&mut self, tuning: &Tuning) -> Result<(), DeviceError> {
        let key = frequency_key(tuning.center_freq_hz);
        if !self.captures.contains_key(&key) {
            let samples = self.load(tuning.center_freq_hz)?;
            self.captures.insert(key, Capture { samples, cursor: 0 });
        }
        self.current = Some(key);
        Ok(())
    }

    fn read(&mut self, sample_count: usize) -> Result<Vec<Complex32>, DeviceError> {
        let key = self.current.ok_or(DeviceError::NotConfigured)?;
        let capture = self
            .captures
            .get_mut(&key)
            .ok_or(DeviceError::NotConfigured)?;
        if capture.samples.is_empty() {
            return Err(DeviceError::ShortRead {
                wanted: sample_count,
                got: 0,
            });
        }

        let mut out = Vec::with_capacity(sample_count);
        while out.len() < sample_count {
            let take = (sample_count - out.len()).min(capture.samples.len() - capture.cursor);
            out.extend_from_slice(&capture.samples[capture.cursor..capture.cursor + take]);
            capture.cursor = (capture.cursor + take) % capture.samples.len();
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::Gain;
    use crate::storage::codec::encode_complex;
    use tempfile::tempdir;

    fn tuning(center: f64) -> Tuning {
        Tuning {
            center_freq_hz: center,
            sample_rate_hz: 2.048e6,
            gain: Gain::Manual(20.0),
        }
    }

    #[test]
    fn test_replay_wraps_around() {
        let dir = tempdir().unwrap();
        let samples: Vec<Complex32> = (0..5u8)
            .map(|i| Complex32::new(f32::from(i), -f32::from(i)))
            .collect();
        std::fs::write(
            IqFileFrontEnd::capture_path(dir.path(), 95e6),
            encode_complex(&samples),
        )
        .unwrap();

        let mut fe = IqFileFrontEnd::new(dir.path());
        fe.configure(&tuning(95e6)).unwrap();
        let first = fe.read(3).unwrap();
        let second = fe.read(4).unwrap();
        assert_eq!(first, samples[..3].to_vec());
        assert_eq!(second[0], samples[3]);
        assert_eq!(second[2], samples[0]);
    }

    #[test]
    fn test_missing_capture_is_tuning_error() {
        let dir = tempdir().unwrap();
        let mut fe = IqFileFrontEnd::new(dir.path());
        let err = fe.configure(&tuning(150e6)).unwrap_err();
        assert!(matches!(err, DeviceError::Tuning { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_misaligned_capture_is_read_error() {
        let dir = tempdir().unwrap();
        std::fs::write(IqFileFrontEnd::capture_path(dir.path(), 49.25e6), [0u8; 7]).unwrap();
        let mut fe = IqFileFrontEnd::new(dir.path());
        assert!(matches!(
            fe.configure(&tuning(49.25e6)),
            Err(DeviceError::Read(_))
        ));
    }
}
