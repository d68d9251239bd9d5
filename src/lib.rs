//! Realtime bidirectional audio/video streaming client for AI mock-interview
//! sessions.
//!
//! This crate drives a live interview session against a Gemini-Live-style
//! generative-voice service: it fetches a short-lived credential, opens a
//! duplex WebSocket, sends a one-time session configuration, streams
//! microphone audio (PCM 16-bit, 16kHz, base64) and periodic webcam frames
//! (JPEG) upstream, and reconstructs the interviewer's streamed audio and the
//! two-party transcript downstream.
//!
//! # Architecture
//!
//! - [`session::LiveSession`] - connection lifecycle state machine
//! - [`audio::AudioInputPipeline`] - microphone capture, VAD, PCM encoding
//! - [`audio::PlaybackScheduler`] - gapless scheduling of inbound audio
//! - [`video::VideoSampler`] - periodic webcam frame capture
//! - [`transcript::Transcript`] - streamed transcript merging
//!
//! # Audio Format
//!
//! Upstream audio is PCM 16-bit signed little-endian at 16kHz; downstream
//! audio from the service is the same format at 24kHz.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use interview_live::audio::{ChannelSource, NullSink};
//! use interview_live::config::InterviewOptions;
//! use interview_live::session::LiveSession;
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = InterviewOptions::from_env("Backend Engineer");
//!     let (frames, source) = ChannelSource::new(16_000);
//!
//!     let session = LiveSession::new(options, Arc::new(NullSink::new()));
//!     session
//!         .connect(Some(Box::new(source)), None)
//!         .await
//!         .unwrap();
//!
//!     // Push captured microphone frames into `frames`...
//!
//!     let report = session.disconnect().await;
//! }
//! ```

pub mod audio;
pub mod auth;
pub mod config;
pub mod error;
pub mod protocol;
pub mod recording;
pub mod session;
pub mod transcript;
pub mod video;

// Re-export commonly used items for convenience
pub use config::{Difficulty, InterviewOptions, InterviewerVoice, Persona};
pub use error::{SessionError, SessionResult};
pub use session::{LiveSession, SessionEvent, SessionState};
pub use transcript::{ReportEntry, Speaker, Turn};
