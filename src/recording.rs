//! Optional WAV capture of interviewer audio.
//!
//! When recording is enabled, every chunk handed to the playback sink is also
//! appended here, and `finalize` writes a 24 kHz mono PCM16 WAV. A recorder
//! dropped without finalizing leaves no file.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use tracing::info;

use crate::audio::encode::OUTPUT_SAMPLE_RATE;
use crate::error::{SessionError, SessionResult};

/// Accumulates interviewer audio for one session.
#[derive(Default)]
pub struct WavRecorder {
    samples: Mutex<Vec<i16>>,
}

impl WavRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        WavRecorder::default()
    }

    /// Append a chunk of decoded output audio.
    pub fn append(&self, chunk: &[i16]) {
        self.samples.lock().extend_from_slice(chunk);
    }

    /// Total samples recorded so far.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Write the accumulated audio as a 24 kHz mono PCM16 WAV file.
    pub fn finalize(&self, path: &Path) -> SessionResult<()> {
        let samples = self.samples.lock();
        let spec = WavSpec {
            channels: 1,
            sample_rate: OUTPUT_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, spec)
            .map_err(|e| SessionError::Internal(format!("wav create: {e}")))?;
        for &sample in samples.iter() {
            writer
                .write_sample(sample)
                .map_err(|e| SessionError::Internal(format!("wav write: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| SessionError::Internal(format!("wav finalize: {e}")))?;

        info!(path = %path.display(), samples = samples.len(), "session recording written");
        Ok(())
    }
}
