//! Outbound (client-to-service) message types.

use serde::Serialize;

use crate::config::InterviewOptions;

/// Mime marker for upstream PCM audio chunks.
pub const AUDIO_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Mime marker for upstream webcam frames.
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// A message sent to the live service.
///
/// Serializes as a single-key JSON object (`setup`, `realtime_input` or
/// `client_content`), matching the upstream protocol.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// One-time session configuration
    Setup {
        /// Setup payload
        setup: Setup,
    },
    /// Streaming media input
    RealtimeInput {
        /// Realtime input payload
        realtime_input: RealtimeInput,
    },
    /// A complete text turn
    ClientContent {
        /// Client content payload
        client_content: ClientContent,
    },
}

/// Session configuration payload, sent exactly once per session.
#[derive(Debug, Clone, Serialize)]
pub struct Setup {
    /// Target model identifier
    pub model: String,
    /// Response generation configuration
    pub generation_config: GenerationConfig,
    /// Request transcription of the candidate's audio
    pub input_audio_transcription: serde_json::Map<String, serde_json::Value>,
    /// Request transcription of the interviewer's audio
    pub output_audio_transcription: serde_json::Map<String, serde_json::Value>,
    /// System prompt
    pub system_instruction: SystemInstruction,
}

/// Generation configuration inside the setup payload.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    /// Requested output modalities (always `["AUDIO"]` here)
    pub response_modalities: Vec<String>,
    /// Voice selection
    pub speech_config: SpeechConfig,
}

/// Speech configuration wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct SpeechConfig {
    /// Voice configuration
    pub voice_config: VoiceConfig,
}

/// Voice configuration wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceConfig {
    /// Prebuilt voice selection
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

/// Prebuilt voice selection.
#[derive(Debug, Clone, Serialize)]
pub struct PrebuiltVoiceConfig {
    /// Voice name (e.g. "Kore")
    pub voice_name: String,
}

/// System instruction wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInstruction {
    /// Prompt parts
    pub parts: Vec<TextPart>,
}

/// A text part.
#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    /// The text content
    pub text: String,
}

/// Streaming media input payload.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeInput {
    /// Media chunks in capture order
    pub media_chunks: Vec<MediaChunk>,
}

/// A single base64-encoded media chunk.
#[derive(Debug, Clone, Serialize)]
pub struct MediaChunk {
    /// Mime marker ([`AUDIO_MIME_TYPE`] or [`JPEG_MIME_TYPE`])
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

/// A complete text turn payload.
#[derive(Debug, Clone, Serialize)]
pub struct ClientContent {
    /// The turns being appended
    pub turns: Vec<ContentTurn>,
    /// Whether the turn is complete (always true for synthetic turns)
    pub turn_complete: bool,
}

/// One turn inside a `client_content` payload.
#[derive(Debug, Clone, Serialize)]
pub struct ContentTurn {
    /// Speaker role ("user")
    pub role: String,
    /// Text parts
    pub parts: Vec<TextPart>,
}

impl ClientMessage {
    /// Build the one-time setup message for a session.
    pub fn setup(options: &InterviewOptions) -> Self {
        ClientMessage::Setup {
            setup: Setup {
                model: options.model.clone(),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: options.voice.as_str().to_string(),
                            },
                        },
                    },
                },
                input_audio_transcription: serde_json::Map::new(),
                output_audio_transcription: serde_json::Map::new(),
                system_instruction: SystemInstruction {
                    parts: vec![TextPart {
                        text: options.system_instruction(),
                    }],
                },
            },
        }
    }

    /// Build a realtime audio chunk message.
    pub fn audio_chunk(base64_pcm: String) -> Self {
        ClientMessage::RealtimeInput {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaChunk {
                    mime_type: AUDIO_MIME_TYPE.to_string(),
                    data: base64_pcm,
                }],
            },
        }
    }

    /// Build a realtime video frame message.
    pub fn video_chunk(base64_jpeg: String) -> Self {
        ClientMessage::RealtimeInput {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaChunk {
                    mime_type: JPEG_MIME_TYPE.to_string(),
                    data: base64_jpeg,
                }],
            },
        }
    }

    /// Build a complete user text turn.
    pub fn user_text_turn(text: impl Into<String>) -> Self {
        ClientMessage::ClientContent {
            client_content: ClientContent {
                turns: vec![ContentTurn {
                    role: "user".to_string(),
                    parts: vec![TextPart { text: text.into() }],
                }],
                turn_complete: true,
            },
        }
    }
}
