//! Wire message types for the live streaming protocol.
//!
//! All messages are JSON-encoded and exchanged over the duplex WebSocket.
//!
//! Client messages (sent to the service):
//! - `setup` - one-time session configuration (model, voice, system prompt)
//! - `realtime_input` - base64 media chunks (PCM audio, JPEG frames)
//! - `client_content` - complete text turns (the synthetic opening turn)
//!
//! Server messages (received from the service):
//! - `setupComplete` - configuration acknowledged, streaming may begin
//! - `serverContent` - audio chunks, transcriptions, interruption and
//!   turn-completion signals
//!
//! The upstream service emits field names in either camelCase or snake_case
//! depending on path; [`server::ServerMessage::parse`] is the single boundary
//! where both spellings are normalized. Nothing past that boundary branches on
//! naming convention.

mod client;
mod server;

pub use client::{
    AUDIO_MIME_TYPE, ClientContent, ClientMessage, ContentTurn, GenerationConfig, JPEG_MIME_TYPE,
    MediaChunk, PrebuiltVoiceConfig, RealtimeInput, Setup, SpeechConfig, SystemInstruction,
    TextPart, VoiceConfig,
};
pub use server::{InlineData, ModelTurn, ServerContent, ServerMessage, ServerPart, Transcription};
