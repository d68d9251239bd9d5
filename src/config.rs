//! Interview session configuration.
//!
//! This module contains the per-session option types:
//! - Interviewer persona and difficulty selection
//! - Voice selection
//! - System instruction assembly from persona/difficulty templates, the
//!   target role and the candidate's resume text

/// Default generative model for live interview sessions.
pub const DEFAULT_LIVE_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-12-2025";

/// Hard cap on resume text embedded in the system instruction, in characters.
/// Bounds the one-time configuration message size.
pub const RESUME_CHAR_LIMIT: usize = 4000;

/// Default base URL of the credential endpoint.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "http://localhost:8000";

/// Environment variable overriding the credential endpoint base URL.
pub const TOKEN_ENDPOINT_ENV: &str = "INTERVIEW_TOKEN_URL";

/// The synthetic opening turn sent once the configuration handshake
/// completes, so the interview starts without the candidate speaking first.
pub const OPENING_TURN_TEXT: &str =
    "Please begin the interview now. Briefly introduce yourself and ask your first question.";

// =============================================================================
// Persona
// =============================================================================

/// Interviewer persona selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persona {
    /// Supportive, encouraging interviewer
    #[default]
    Friendly,
    /// Direct, no-nonsense interviewer
    Tough,
    /// Big-tech technical bar-raiser
    Faang,
    /// Ruthless, brutally critical interviewer
    Roast,
}

impl Persona {
    /// Convert to the canonical identifier.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Friendly => "friendly",
            Self::Tough => "tough",
            Self::Faang => "faang",
            Self::Roast => "roast",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "friendly" => Self::Friendly,
            "tough" => Self::Tough,
            "faang" => Self::Faang,
            "roast" => Self::Roast,
            _ => Self::default(),
        }
    }

    /// The persona paragraph of the system instruction.
    fn template(&self) -> &'static str {
        match self {
            Self::Friendly => {
                "You are a warm, supportive technical interviewer. You put the candidate at \
                 ease, acknowledge good answers and gently steer them when they go off track."
            }
            Self::Tough => {
                "You are a direct, no-nonsense technical interviewer. You press for precise \
                 answers, challenge vague claims and do not accept hand-waving."
            }
            Self::Faang => {
                "You are a senior bar-raiser interviewer at a top tech company. You probe for \
                 depth in system design and coding, and expect structured, quantified answers."
            }
            Self::Roast => {
                "You are a ruthless interviewer. You are brutally critical of weak answers, \
                 point out every inconsistency on the resume and show no patience for filler."
            }
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Difficulty
// =============================================================================

/// Interview difficulty selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    /// Entry-level questions, generous pacing
    Easy,
    /// Mid-level depth
    #[default]
    Medium,
    /// Senior-level depth, follow-ups on every answer
    Hard,
}

impl Difficulty {
    /// Convert to the canonical identifier.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "easy" => Self::Easy,
            "medium" => Self::Medium,
            "hard" => Self::Hard,
            _ => Self::default(),
        }
    }

    fn template(&self) -> &'static str {
        match self {
            Self::Easy => {
                "Keep the difficulty entry-level: fundamentals, one concept at a time, and \
                 offer hints when the candidate stalls."
            }
            Self::Medium => {
                "Keep the difficulty mid-level: practical scenarios with one or two follow-up \
                 questions per topic."
            }
            Self::Hard => {
                "Keep the difficulty senior-level: open-ended system design and edge cases, \
                 with a follow-up on every answer."
            }
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Voice
// =============================================================================

/// Available prebuilt voices for the interviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterviewerVoice {
    /// Kore voice (default)
    #[default]
    Kore,
    /// Charon voice
    Charon,
    /// Aoede voice
    Aoede,
    /// Puck voice
    Puck,
    /// Fenrir voice
    Fenrir,
}

impl InterviewerVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kore => "Kore",
            Self::Charon => "Charon",
            Self::Aoede => "Aoede",
            Self::Puck => "Puck",
            Self::Fenrir => "Fenrir",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "kore" => Self::Kore,
            "charon" => Self::Charon,
            "aoede" => Self::Aoede,
            "puck" => Self::Puck,
            "fenrir" => Self::Fenrir,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for InterviewerVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Options
// =============================================================================

/// Options for a single interview session.
#[derive(Debug, Clone)]
pub struct InterviewOptions {
    /// Target role the candidate is interviewing for
    pub role: String,
    /// Interviewer persona
    pub persona: Persona,
    /// Interview difficulty
    pub difficulty: Difficulty,
    /// Interviewer voice
    pub voice: InterviewerVoice,
    /// Extracted resume plain text (truncated to [`RESUME_CHAR_LIMIT`] when
    /// embedded in the system instruction)
    pub resume_text: String,
    /// Model identifier sent in the setup message
    pub model: String,
    /// Base URL of the credential endpoint
    pub token_endpoint: String,
    /// Override for the live streaming endpoint; when `None` the endpoint is
    /// routed from the credential shape
    pub live_endpoint: Option<String>,
    /// Record the interviewer's audio to an in-memory WAV buffer
    pub record_output: bool,
}

impl InterviewOptions {
    /// Create options for a role with all defaults.
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            persona: Persona::default(),
            difficulty: Difficulty::default(),
            voice: InterviewerVoice::default(),
            resume_text: String::new(),
            model: DEFAULT_LIVE_MODEL.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            live_endpoint: None,
            record_output: false,
        }
    }

    /// Create options for a role, reading the credential endpoint base URL
    /// from the environment (`INTERVIEW_TOKEN_URL`, `.env` honored).
    pub fn from_env(role: impl Into<String>) -> Self {
        let _ = dotenvy::dotenv();
        let mut options = Self::new(role);
        if let Ok(url) = std::env::var(TOKEN_ENDPOINT_ENV) {
            options.token_endpoint = url;
        }
        options
    }

    /// Assemble the system instruction for the setup message.
    ///
    /// Persona and difficulty templates, the target role, the (truncated)
    /// resume text and the voice-only style rules are combined into a single
    /// prompt. The style rules exist because the upstream voice model
    /// occasionally leaks planning text into its spoken output.
    pub fn system_instruction(&self) -> String {
        let resume: String = self.resume_text.chars().take(RESUME_CHAR_LIMIT).collect();

        format!(
            "{persona}\n\
             You are interviewing the candidate for the role of: {role}.\n\
             {difficulty}\n\
             \n\
             CANDIDATE STARTING CONTEXT (RESUME HIGHLIGHTS):\n\
             {resume}\n\
             \n\
             YOUR GOAL:\n\
             1. Conduct a rigorous but fair interview for the stated role.\n\
             2. Start by briefly validating 1-2 key items from their resume to build rapport.\n\
             3. Then move to a system design or coding challenge fitting the role.\n\
             \n\
             STYLE GUIDELINES (STRICT):\n\
             - You are a VOICE-ONLY interface.\n\
             - You must NOT generate internal thought logs, plans, or headers (e.g., \"**Initiating...**\").\n\
             - You must NOT say things like \"I'm focusing on...\" or \"I will now ask...\".\n\
             - Your output must ONLY be the exact words you speak to the candidate.\n\
             - Be concise (under 30 seconds per turn).\n\
             - Speak naturally and professionally.",
            persona = self.persona.template(),
            role = self.role,
            difficulty = self.difficulty.template(),
            resume = resume,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_parse() {
        assert_eq!(Persona::from_str_or_default("roast"), Persona::Roast);
        assert_eq!(Persona::from_str_or_default("FAANG"), Persona::Faang);
        assert_eq!(Persona::from_str_or_default("unknown"), Persona::Friendly);
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(Difficulty::from_str_or_default("hard"), Difficulty::Hard);
        assert_eq!(Difficulty::from_str_or_default("??"), Difficulty::Medium);
    }

    #[test]
    fn test_voice_parse() {
        assert_eq!(
            InterviewerVoice::from_str_or_default("puck"),
            InterviewerVoice::Puck
        );
        assert_eq!(
            InterviewerVoice::from_str_or_default("robot"),
            InterviewerVoice::Kore
        );
        assert_eq!(InterviewerVoice::Puck.as_str(), "Puck");
    }

    #[test]
    fn test_system_instruction_contains_role_and_resume() {
        let mut options = InterviewOptions::new("Platform Engineer");
        options.resume_text = "Built a distributed cache in Rust.".to_string();

        let prompt = options.system_instruction();
        assert!(prompt.contains("Platform Engineer"));
        assert!(prompt.contains("distributed cache"));
        assert!(prompt.contains("VOICE-ONLY"));
    }

    #[test]
    fn test_system_instruction_truncates_resume() {
        let mut options = InterviewOptions::new("Engineer");
        options.resume_text = "x".repeat(RESUME_CHAR_LIMIT + 500);

        let prompt = options.system_instruction();
        let run = prompt.chars().filter(|c| *c == 'x').count();
        assert_eq!(run, RESUME_CHAR_LIMIT);
    }

    #[test]
    fn test_defaults() {
        let options = InterviewOptions::new("Engineer");
        assert_eq!(options.model, DEFAULT_LIVE_MODEL);
        assert_eq!(options.voice, InterviewerVoice::Kore);
        assert!(!options.record_output);
    }
}
