//! Core data model types for assessor.
//!
//! Questions are immutable once loaded. Messages and response records are
//! append-only and never mutated after they are pushed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::store::SessionHandle;

/// A single assessment question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the catalog.
    pub id: String,
    /// Topical tag used for grouped reporting.
    pub category: String,
    /// How hard the question is.
    pub difficulty: Difficulty,
    /// The text put to the respondent.
    pub prompt: String,
    /// Phrases whose keywords a good answer should mention.
    #[serde(default)]
    pub expected_keyword_phrases: Vec<String>,
}

/// Question difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "beginner"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" | "basic" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" | "expert" => Ok(Difficulty::Advanced),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Asker,
    Respondent,
}

/// One entry of the session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub speaker: Speaker,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(text: impl Into<String>, speaker: Speaker) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            speaker,
            created_at: Utc::now(),
        }
    }

    pub fn asker(text: impl Into<String>) -> Self {
        Self::new(text, Speaker::Asker)
    }

    pub fn respondent(text: impl Into<String>) -> Self {
        Self::new(text, Speaker::Respondent)
    }
}

/// A scored answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub question_id: String,
    pub response_text: String,
    /// Keyword score in `0..=100`.
    pub score: u8,
}

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Active,
    Completed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Completed => write!(f, "completed"),
        }
    }
}

/// Display status of a catalog position, derived from the current index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Pending,
    Current,
    Completed,
}

/// Observable snapshot of a session.
///
/// `current_question_index` is `None` while idle. While active,
/// `responses.len()` equals the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub current_question_index: Option<usize>,
    pub started_at: Option<DateTime<Utc>>,
    pub responses: Vec<ResponseRecord>,
    pub session_ref: Option<SessionHandle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_display_and_parse() {
        assert_eq!(Difficulty::Beginner.to_string(), "beginner");
        assert_eq!(
            "Intermediate".parse::<Difficulty>().unwrap(),
            Difficulty::Intermediate
        );
        assert_eq!("expert".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert!("trivial".parse::<Difficulty>().is_err());
    }

    #[test]
    fn idle_state_has_no_index() {
        let state = SessionState::default();
        assert_eq!(state.phase, SessionPhase::Idle);
        assert!(state.current_question_index.is_none());
        assert!(state.responses.is_empty());
    }

    #[test]
    fn question_serde_uses_snake_case() {
        let q = Question {
            id: "q1".into(),
            category: "Basic Formulas".into(),
            difficulty: Difficulty::Beginner,
            prompt: "Explain cell references.".into(),
            expected_keyword_phrases: vec!["relative references".into()],
        };
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains("\"expected_keyword_phrases\""));
        assert!(json.contains("\"beginner\""));
    }
}
