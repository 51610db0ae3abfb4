//! Session Store contract.
//!
//! The lifecycle manager talks to persistence only through this trait.
//! Implementations live in the `assessor-store` crate.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::model::Question;

/// Opaque reference to a persisted session record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the store remembers about a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub completed_at: DateTime<Utc>,
    pub overall_score: f64,
}

/// Persisted status of a session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// One persisted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub question_id: String,
    pub response_text: String,
    pub score: u8,
    pub recorded_at: DateTime<Utc>,
}

/// The persisted form of a session, shared by store implementations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub handle: SessionHandle,
    pub respondent_id: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub total_questions: usize,
    pub current_question_index: usize,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub responses: Vec<StoredResponse>,
}

impl SessionRecord {
    /// A fresh in-progress record positioned at the first question.
    pub fn new(handle: SessionHandle, respondent_id: &str, total_questions: usize) -> Self {
        Self {
            handle,
            respondent_id: respondent_id.to_string(),
            status: SessionStatus::InProgress,
            started_at: Utc::now(),
            completed_at: None,
            total_questions,
            current_question_index: 0,
            overall_score: None,
            feedback: None,
            responses: Vec::new(),
        }
    }

    /// Mark the record completed.
    pub fn complete(&mut self, overall_score: f64, feedback: &str) {
        self.status = SessionStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.overall_score = Some(overall_score);
        self.feedback = Some(feedback.to_string());
    }

    /// The summary of this record, if it is completed.
    pub fn summary(&self) -> Option<SessionSummary> {
        match (self.status, self.completed_at) {
            (SessionStatus::Completed, Some(completed_at)) => Some(SessionSummary {
                completed_at,
                overall_score: self.overall_score.unwrap_or(0.0),
            }),
            _ => None,
        }
    }
}

/// External persistence for questions, sessions, and responses.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Human-readable store name (e.g. "memory").
    fn name(&self) -> &str;

    /// Active questions, in stable order.
    async fn load_active_questions(&self) -> Result<Vec<Question>, PersistenceError>;

    /// The respondent's completed session, if there is one.
    async fn find_completed_session(
        &self,
        respondent_id: &str,
    ) -> Result<Option<SessionSummary>, PersistenceError>;

    /// Persist a new in-progress session positioned at question 0.
    async fn create_session(
        &self,
        respondent_id: &str,
        total_questions: usize,
    ) -> Result<SessionHandle, PersistenceError>;

    /// Persist one scored answer.
    async fn record_response(
        &self,
        session: &SessionHandle,
        question_id: &str,
        response_text: &str,
        score: u8,
    ) -> Result<(), PersistenceError>;

    /// Persist the index of the question now being asked.
    async fn update_progress(
        &self,
        session: &SessionHandle,
        current_question_index: usize,
    ) -> Result<(), PersistenceError>;

    /// Mark the session completed with its aggregate score and summary text.
    async fn complete_session(
        &self,
        session: &SessionHandle,
        overall_score: f64,
        feedback: &str,
    ) -> Result<(), PersistenceError>;
}
