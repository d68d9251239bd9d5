//! Audio pipelines for the live session.
//!
//! The input path captures mono float frames from an [`AudioSource`], runs
//! energy-based voice-activity detection for barge-in, resamples/encodes to
//! PCM 16-bit 16kHz and transmits base64 chunks while the session gate is
//! open. The output path decodes inbound base64 PCM at 24kHz and schedules it
//! gaplessly on a [`PlaybackSink`]'s clock.

pub mod encode;
pub mod input;
pub mod output;
pub mod vad;

#[cfg(feature = "cpal-backend")]
pub mod cpal_backend;

pub use encode::{
    CAPTURE_BLOCK_SIZE, OUTPUT_SAMPLE_RATE, TARGET_SAMPLE_RATE, decode_base64_pcm16,
    encode_base64_frame, f32_to_pcm16, pcm16_to_f32, resample_nearest,
};
pub use input::{AudioInputPipeline, AudioSource, ChannelSource};
pub use output::{NullSink, PlaybackScheduler, PlaybackSink, ScheduledHandle};
pub use vad::EnergyVad;

#[cfg(feature = "cpal-backend")]
pub use cpal_backend::CpalMicSource;
