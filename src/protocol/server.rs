//! Inbound (service-to-client) message types.
//!
//! The upstream service is inconsistent about field casing: the same field
//! may arrive as `turnComplete` or `turn_complete` depending on endpoint
//! family. Every field here declares the alternate spelling as a serde alias,
//! so [`ServerMessage::parse`] is the single place where the duality exists.

use serde::Deserialize;

use crate::error::{SessionError, SessionResult};

/// A message received from the live service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerMessage {
    /// Configuration acknowledgment; value shape varies upstream, presence is
    /// what matters
    #[serde(default, alias = "setupComplete")]
    pub setup_complete: Option<serde_json::Value>,

    /// Streaming content
    #[serde(default, alias = "serverContent")]
    pub server_content: Option<ServerContent>,
}

/// Streaming content from the remote peer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerContent {
    /// Audio (and occasionally text) parts of the interviewer's current turn
    #[serde(default, alias = "modelTurn")]
    pub model_turn: Option<ModelTurn>,

    /// Partial transcription of the interviewer's speech
    #[serde(
        default,
        alias = "outputTranscription",
        alias = "modelTurnTranscription",
        alias = "model_turn_transcription"
    )]
    pub output_transcription: Option<Transcription>,

    /// Partial transcription of the candidate's speech
    #[serde(default, alias = "inputTranscription")]
    pub input_transcription: Option<Transcription>,

    /// The remote peer acknowledged a barge-in interruption
    #[serde(default)]
    pub interrupted: Option<bool>,

    /// The current turn is complete
    #[serde(default, alias = "turnComplete")]
    pub turn_complete: Option<bool>,
}

/// The interviewer's streamed turn content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelTurn {
    /// Content parts in stream order
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

/// One part of a model turn.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerPart {
    /// Base64 audio payload
    #[serde(default, alias = "inlineData")]
    pub inline_data: Option<InlineData>,

    /// Text payload (not spoken; ignored by the audio path)
    #[serde(default)]
    pub text: Option<String>,
}

/// Base64-encoded inline media.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InlineData {
    /// Mime marker, when present
    #[serde(default, alias = "mimeType")]
    pub mime_type: Option<String>,

    /// Base64 payload
    #[serde(default)]
    pub data: String,
}

/// A partial transcription fragment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transcription {
    /// Transcribed text fragment
    #[serde(default)]
    pub text: Option<String>,

    /// Whether the transcription for this turn is finished
    #[serde(default)]
    pub finished: Option<bool>,
}

impl ServerMessage {
    /// Parse a raw inbound frame into the canonical message type.
    ///
    /// This is the normalization boundary for the camelCase/snake_case
    /// duality; a failure here means the frame is dropped by the caller.
    pub fn parse(raw: &str) -> SessionResult<ServerMessage> {
        serde_json::from_str(raw).map_err(|e| SessionError::Parse(e.to_string()))
    }
}
