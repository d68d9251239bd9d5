//! Transcript reconciliation.
//!
//! The service streams partial transcription fragments for both speakers,
//! interleaved and unordered relative to turn boundaries. The reconciler
//! merges fragments into an append-only sequence of turns: consecutive
//! fragments from the same speaker absorb into the last unsealed turn, a
//! turn-complete signal seals it, and sealed turns are never mutated.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use tracing::trace;

/// Who is speaking in a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    /// The candidate
    User,
    /// The AI interviewer
    Interviewer,
}

impl Speaker {
    /// Role label used in the report payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Interviewer => "interviewer",
        }
    }
}

/// One reconciled turn of conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// Who spoke
    pub speaker: Speaker,
    /// Accumulated text, space-joined from fragments
    pub text: String,
    /// Wall-clock milliseconds when the turn started
    pub timestamp_ms: u64,
    /// Sealed turns are immutable; only the last turn can be unsealed
    pub is_complete: bool,
}

/// A sealed turn in the shape handed to the external analysis endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportEntry {
    /// Speaker role ("user" or "interviewer")
    pub role: String,
    /// Full turn text
    pub content: String,
    /// Wall-clock milliseconds when the turn started
    pub timestamp_ms: u64,
}

/// Fragments matching this are leaked internal monologue, not speech.
///
/// The service occasionally emits its own stage directions into the output
/// transcription stream (markdown emphasis, first-person planning). The
/// pattern list is best-effort and cosmetic; a missed fragment degrades the
/// transcript, nothing else.
static MONOLOGUE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(\*|_|\(|I will now\b|I'll now\b|I am going to\b|I'm going to\b|I should\b|I need to\b|Let me think\b|Thinking:)",
    )
    .expect("monologue pattern is valid")
});

/// Append-only transcript built from streamed fragments.
///
/// Deterministic: the same fragment/seal sequence always produces the same
/// turn sequence, so replaying events after a race is harmless.
#[derive(Default)]
pub struct Transcript {
    turns: Mutex<Vec<Turn>>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Transcript::default()
    }

    /// Merge one transcription fragment.
    ///
    /// Interviewer fragments that look like leaked internal monologue are
    /// dropped. A fragment from the same speaker as the last unsealed turn is
    /// absorbed into it; anything else starts a new turn.
    pub fn push_fragment(&self, speaker: Speaker, text: &str, timestamp_ms: u64) {
        let fragment = text.trim();
        if fragment.is_empty() {
            return;
        }
        if speaker == Speaker::Interviewer && MONOLOGUE_PATTERN.is_match(fragment) {
            trace!(fragment, "dropped monologue fragment");
            return;
        }

        let mut turns = self.turns.lock();
        match turns.last_mut() {
            Some(last) if last.speaker == speaker && !last.is_complete => {
                if !last.text.is_empty() {
                    last.text.push(' ');
                }
                last.text.push_str(fragment);
            }
            _ => {
                turns.push(Turn {
                    speaker,
                    text: fragment.to_string(),
                    timestamp_ms,
                    is_complete: false,
                });
            }
        }
    }

    /// Seal the last turn. No-op when the transcript is empty or the last
    /// turn is already sealed.
    pub fn seal_last(&self) {
        if let Some(last) = self.turns.lock().last_mut() {
            last.is_complete = true;
        }
    }

    /// Seal every turn. Used when the session ends.
    pub fn seal_all(&self) {
        for turn in self.turns.lock().iter_mut() {
            turn.is_complete = true;
        }
    }

    /// Read-only snapshot of the current turn sequence.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.lock().clone()
    }

    /// Number of turns so far.
    pub fn len(&self) -> usize {
        self.turns.lock().len()
    }

    /// Whether no turns have been recorded.
    pub fn is_empty(&self) -> bool {
        self.turns.lock().is_empty()
    }

    /// Drop all turns. Used on disconnect teardown.
    pub fn clear(&self) {
        self.turns.lock().clear();
    }

    /// Map sealed turns to the plain role/content/timestamp list handed to
    /// the external analysis endpoint.
    pub fn to_report_payload(&self) -> Vec<ReportEntry> {
        self.turns
            .lock()
            .iter()
            .filter(|t| t.is_complete)
            .map(|t| ReportEntry {
                role: t.speaker.as_str().to_string(),
                content: t.text.clone(),
                timestamp_ms: t.timestamp_ms,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_speaker_fragments_merge() {
        let t = Transcript::new();
        t.push_fragment(Speaker::Interviewer, "Tell me", 100);
        t.push_fragment(Speaker::Interviewer, "about yourself.", 150);

        let turns = t.snapshot();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "Tell me about yourself.");
        assert_eq!(turns[0].timestamp_ms, 100);
        assert!(!turns[0].is_complete);
    }

    #[test]
    fn test_speaker_change_starts_new_turn() {
        let t = Transcript::new();
        t.push_fragment(Speaker::Interviewer, "Hello.", 0);
        t.push_fragment(Speaker::User, "Hi.", 50);

        let turns = t.snapshot();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker, Speaker::Interviewer);
        assert_eq!(turns[1].speaker, Speaker::User);
    }

    #[test]
    fn test_sealed_turn_is_immutable() {
        let t = Transcript::new();
        t.push_fragment(Speaker::User, "First answer.", 0);
        t.seal_last();
        t.push_fragment(Speaker::User, "Second answer.", 500);

        let turns = t.snapshot();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "First answer.");
        assert!(turns[0].is_complete);
        assert_eq!(turns[1].text, "Second answer.");
        assert!(!turns[1].is_complete);
    }

    #[test]
    fn test_monologue_fragments_dropped() {
        let t = Transcript::new();
        t.push_fragment(Speaker::Interviewer, "*clears throat*", 0);
        t.push_fragment(Speaker::Interviewer, "I will now ask a question.", 10);
        t.push_fragment(Speaker::Interviewer, "(pauses)", 20);
        t.push_fragment(Speaker::Interviewer, "What is a mutex?", 30);

        let turns = t.snapshot();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "What is a mutex?");
    }

    #[test]
    fn test_monologue_filter_spares_user() {
        // The candidate may legitimately narrate their thinking.
        let t = Transcript::new();
        t.push_fragment(Speaker::User, "I will now walk through my approach.", 0);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_empty_and_whitespace_fragments_ignored() {
        let t = Transcript::new();
        t.push_fragment(Speaker::User, "", 0);
        t.push_fragment(Speaker::User, "   ", 0);
        assert!(t.is_empty());
    }

    #[test]
    fn test_identical_event_sequences_are_idempotent() {
        let build = || {
            let t = Transcript::new();
            t.push_fragment(Speaker::Interviewer, "Why", 0);
            t.push_fragment(Speaker::Interviewer, "Rust?", 5);
            t.seal_last();
            t.push_fragment(Speaker::User, "Memory safety.", 100);
            t.seal_last();
            t.snapshot()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_report_payload_contains_sealed_turns_only() {
        let t = Transcript::new();
        t.push_fragment(Speaker::Interviewer, "Question one.", 0);
        t.seal_last();
        t.push_fragment(Speaker::User, "still talking", 100);

        let report = t.to_report_payload();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].role, "interviewer");
        assert_eq!(report[0].content, "Question one.");

        t.seal_all();
        assert_eq!(t.to_report_payload().len(), 2);
    }

    #[test]
    fn test_clear_resets_transcript() {
        let t = Transcript::new();
        t.push_fragment(Speaker::User, "Hello", 0);
        t.clear();
        assert!(t.is_empty());
    }
}
