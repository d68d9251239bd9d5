//! PCM encoding, decoding and resampling.
//!
//! Upstream audio is PCM 16-bit signed little-endian mono at 16kHz;
//! downstream audio is the same format at 24kHz. Resampling uses
//! nearest-neighbor decimation, which is a deliberate fidelity compromise
//! acceptable for speech.

use base64::prelude::*;
use bytes::{BufMut, BytesMut};

use crate::error::{SessionError, SessionResult};

/// Fixed target sample rate for upstream audio.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of downstream audio from the service.
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Nominal capture block size in samples.
pub const CAPTURE_BLOCK_SIZE: usize = 4096;

/// Resample mono float samples with nearest-neighbor decimation.
///
/// Returns the input unchanged when the rates already match.
pub fn resample_nearest(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = src_rate as f64 / dst_rate as f64;
    let new_len = (samples.len() as f64 / ratio).floor() as usize;

    (0..new_len)
        .map(|i| {
            let original = ((i as f64 * ratio).floor() as usize).min(samples.len() - 1);
            samples[original]
        })
        .collect()
}

/// Convert float samples in [-1, 1] to signed 16-bit PCM.
///
/// Samples are clamped before scaling; negative values scale by 0x8000 and
/// non-negative by 0x7fff so both extremes map onto the full i16 range.
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| {
            let s = sample.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * 0x8000 as f32) as i16
            } else {
                (s * 0x7fff as f32) as i16
            }
        })
        .collect()
}

/// Convert signed 16-bit PCM to normalized float samples.
pub fn pcm16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Encode a captured float frame as a base64 PCM16 packet at the target rate.
pub fn encode_base64_frame(samples: &[f32], src_rate: u32) -> String {
    let resampled = resample_nearest(samples, src_rate, TARGET_SAMPLE_RATE);
    let pcm = f32_to_pcm16(&resampled);

    let mut bytes = BytesMut::with_capacity(pcm.len() * 2);
    for sample in pcm {
        bytes.put_i16_le(sample);
    }
    BASE64_STANDARD.encode(&bytes)
}

/// Decode a base64 PCM16 payload into samples.
///
/// Fails with [`SessionError::Decode`] on invalid base64 or an odd byte
/// count; the caller drops the chunk and continues.
pub fn decode_base64_pcm16(data: &str) -> SessionResult<Vec<i16>> {
    let bytes = BASE64_STANDARD
        .decode(data)
        .map_err(|e| SessionError::Decode(e.to_string()))?;

    if bytes.len() % 2 != 0 {
        return Err(SessionError::Decode(format!(
            "odd PCM16 payload length: {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}
