//! Blob codecs for detection payloads.
//!
//! Every blob is a flat little-endian float32 array. Complex samples are
//! interleaved real/imag pairs; waterfalls are row-major with the row count
//! carried alongside in the record metadata.

use num_complex::Complex32;
use thiserror::Error;

const F32_BYTES: usize = 4;
const COMPLEX_BYTES: usize = 2 * F32_BYTES;

/// Failures decoding a stored blob. Only consumers reading blobs back see these.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("blob length {len} is not a multiple of {unit} bytes")]
    Misaligned { len: usize, unit: usize },

    #[error("waterfall of {values} values cannot be split into {rows} rows")]
    RaggedWaterfall { values: usize, rows: usize },
}

/// Narrow `f64` values to float32 and pack them.
pub fn encode_f32(values: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * F32_BYTES);
    for &v in values {
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&(v as f32).to_le_bytes());
    }
    out
}

pub fn encode_f32_slice(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * F32_BYTES);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

pub fn decode_f32(bytes: &[u8]) -> Result<Vec<f32>, DecodeError> {
    if bytes.len() % F32_BYTES != 0 {
        return Err(DecodeError::Misaligned {
            len: bytes.len(),
            unit: F32_BYTES,
        });
    }
    Ok(bytes
        .chunks_exact(F32_BYTES)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Interleave real/imag as consecutive float32 values.
pub fn encode_complex(samples: &[Complex32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * COMPLEX_BYTES);
    for s in samples {
        out.extend_from_slice(&s.re.to_le_bytes());
        out.extend_from_slice(&s.im.to_le_bytes());
    }
    out
}

pub fn decode_complex(bytes: &[u8]) -> Result<Vec<Complex32>, DecodeError> {
    if bytes.len() % COMPLEX_BYTES != 0 {
        return Err(DecodeError::Misaligned {
            len: bytes.len(),
            unit: COMPLEX_BYTES,
        });
    }
    let values = decode_f32(bytes)?;
    Ok(values
        .chunks_exact(2)
        .map(|pair| Complex32::new(pair[0], pair[1]))
        .collect())
}

/// Stack rows into one row-major blob.
///
/// Rows are truncated to the shortest row so the result is rectangular.
/// Returns the blob and the number of rows it holds.
pub fn encode_waterfall(rows: &[Vec<f32>]) -> (Vec<u8>, usize) {
    let width = rows.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(rows.len() * width * F32_BYTES);
    for row in rows {
        out.extend(encode_f32_slice(&row[..width]));
    }
    (out, rows.len())
}

pub fn decode_waterfall(bytes: &[u8], rows: usize) -> Result<Vec<Vec<f32>>, DecodeError> {
    let values = decode_f32(bytes)?;
    if rows == 0 {
        return if values.is_empty() {
            Ok(Vec::new())
        } else {
            Err(DecodeError::RaggedWaterfall {
                values: values.len(),
                rows,
            })
        };
    }
    if values.len() % rows != 0 {
        return Err(DecodeError::RaggedWaterfall {
            values: values.len(),
            rows,
        });
    }
    let width = values.len() / rows;
    if width == 0 {
        return Ok(vec![Vec::new(); rows]);
    }
    Ok(values.chunks_exact(width).map(<[f32]>::to_vec).collect())
}
