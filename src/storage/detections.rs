//! Detection record storage on sled
//!
//! Two trees:
//! - `detections`: key = detection sequence (u64 big-endian), value = JSON metadata
//! - `blobs`: key = sequence (u64 big-endian) + blob kind byte, value = raw blob
//!
//! Big-endian keys sort numerically, so iteration order is detection order.
//! Blobs are written before their metadata; a record is visible once its
//! metadata exists.

use num_complex::Complex32;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::codec::{decode_complex, decode_f32, decode_waterfall, DecodeError};
use super::persistence::{DetectionSink, PersistenceError};
use crate::types::{DetectionBlobs, DetectionRecord};

const META_TREE: &str = "detections";
const BLOB_TREE: &str = "blobs";

/// Which payload a blob key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum BlobKind {
    PowerSpectrum = 0,
    RawSamples = 1,
    Waterfall = 2,
    PeakFrequencies = 3,
}

fn blob_key(sequence: u64, kind: BlobKind) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[..8].copy_from_slice(&sequence.to_be_bytes());
    key[8] = kind as u8;
    key
}

/// Durable detection store
#[derive(Clone)]
pub struct SledDetectionStore {
    db: Arc<sled::Db>,
    meta: sled::Tree,
    blobs: sled::Tree,
}

impl SledDetectionStore {
    /// Open or create the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        let meta = db.open_tree(META_TREE)?;
        let blobs = db.open_tree(BLOB_TREE)?;
        info!(path = %path.display(), records = meta.len(), "Detection store opened");
        Ok(Self {
            db: Arc::new(db),
            meta,
            blobs,
        })
    }

    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    /// Highest stored detection sequence, if any.
    pub fn last_sequence(&self) -> Result<Option<u64>, PersistenceError> {
        Ok(self
            .meta
            .last()?
            .and_then(|(key, _)| key.as_ref().try_into().ok().map(u64::from_be_bytes)))
    }

    /// Most recent `limit` records (newest first), blobs attached.
    ///
    /// Entries whose metadata no longer parses are skipped with a warning.
    pub fn recent(&self, limit: usize) -> Result<Vec<DetectionRecord>, PersistenceError> {
        let mut records = Vec::with_capacity(limit);
        for item in self.meta.iter().rev() {
            if records.len() >= limit {
                break;
            }
            let (_key, value) = item?;
            let mut record: DetectionRecord = match serde_json::from_slice(&value) {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable detection metadata");
                    continue;
                }
            };
            record.blobs = self.load_blobs(record.detection_sequence)?;
            records.push(record);
        }
        Ok(records)
    }

    fn load_blobs(&self, sequence: u64) -> Result<DetectionBlobs, PersistenceError> {
        let get = |kind| -> Result<Option<Vec<u8>>, PersistenceError> {
            Ok(self.blobs.get(blob_key(sequence, kind))?.map(|v| v.to_vec()))
        };
        Ok(DetectionBlobs {
            power_spectrum: get(BlobKind::PowerSpectrum)?.unwrap_or_default(),
            raw_samples: get(BlobKind::RawSamples)?.unwrap_or_default(),
            waterfall: get(BlobKind::Waterfall)?,
            peak_frequencies: get(BlobKind::PeakFrequencies)?.unwrap_or_default(),
        })
    }
}

impl DetectionSink for SledDetectionStore {
    fn store(&self, record: &DetectionRecord) -> Result<(), PersistenceError> {
        let seq = record.detection_sequence;
        let b = &record.blobs;

        self.blobs
            .insert(blob_key(seq, BlobKind::PowerSpectrum), b.power_spectrum.as_slice())?;
        self.blobs
            .insert(blob_key(seq, BlobKind::RawSamples), b.raw_samples.as_slice())?;
        if let Some(waterfall) = &b.waterfall {
            self.blobs
                .insert(blob_key(seq, BlobKind::Waterfall), waterfall.as_slice())?;
        }
        self.blobs.insert(
            blob_key(seq, BlobKind::PeakFrequencies),
            b.peak_frequencies.as_slice(),
        )?;

        let value = serde_json::to_vec(record)?;
        self.meta.insert(seq.to_be_bytes(), value)?;

        debug!(sequence = seq, frequency_hz = record.frequency_hz, "Stored detection");
        Ok(())
    }

    fn flush(&self) -> Result<(), PersistenceError> {
        self.db.flush()?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}

// ============================================================================
// Blob decoding (read side)
// ============================================================================

/// A record's blobs decoded back to numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBlobs {
    pub power_spectrum: Vec<f32>,
    pub raw_samples: Vec<Complex32>,
    /// Oldest row first; empty when no snapshot was stored
    pub waterfall: Vec<Vec<f32>>,
    pub peak_frequencies: Vec<f32>,
}

pub fn decode_blobs(record: &DetectionRecord) -> Result<DecodedBlobs, DecodeError> {
    let b = &record.blobs;
    Ok(DecodedBlobs {
        power_spectrum: decode_f32(&b.power_spectrum)?,
        raw_samples: decode_complex(&b.raw_samples)?,
        waterfall: match &b.waterfall {
            Some(bytes) => decode_waterfall(bytes, record.waterfall_rows)?,
            None => Vec::new(),
        },
        peak_frequencies: decode_f32(&b.peak_frequencies)?,
    })
}
