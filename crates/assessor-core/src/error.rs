//! Session error taxonomy.
//!
//! Validation and policy errors surface to the caller before any side
//! effect. Persistence errors are fatal only when creating a session; the
//! lifecycle manager logs and swallows them for per-answer writes.

use thiserror::Error;

use crate::model::SessionPhase;
use crate::store::{SessionHandle, SessionSummary};

/// Respondent input rejected before any state mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The submission was empty or whitespace-only.
    #[error("response is empty")]
    EmptyResponse,
}

/// A Session Store call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// The backing service could not be reached or refused the write.
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    /// No session record exists for the handle.
    #[error("session not found: {0}")]
    SessionNotFound(SessionHandle),

    /// Reading or writing the backing storage failed.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store has no question catalog to load from.
    #[error("no question catalog configured for this store")]
    CatalogNotConfigured,
}

/// A session-lifecycle rule was violated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// The respondent already finished an assessment.
    #[error("respondent '{respondent_id}' already completed an assessment")]
    AlreadyCompleted {
        respondent_id: String,
        summary: SessionSummary,
    },

    /// Another session for the respondent is live in this process.
    #[error("respondent '{respondent_id}' already has a live session")]
    SessionInProgress { respondent_id: String },

    /// The operation needs an active session.
    #[error("session is not active (phase: {phase})")]
    NotActive { phase: SessionPhase },
}

/// Errors returned by the session lifecycle operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl SessionError {
    /// Returns `true` if the session cannot continue after this error.
    ///
    /// Validation errors only reject a single submission.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::Validation(_))
    }
}

/// Misuse of the turn controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    /// `advance` was called with no question left to move past.
    #[error("no question to advance past (index {index} of {len})")]
    Exhausted { index: usize, len: usize },

    /// The controller has not been started.
    #[error("turn controller not started")]
    NotStarted,
}
