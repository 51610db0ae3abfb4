//! Turn controller: the question index and the answers collected so far.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::TurnError;
use crate::model::{Question, QuestionStatus, ResponseRecord};

/// Tracks which question is being asked and the responses recorded so far.
///
/// The controller never moves backwards. Once started, each recorded
/// response is followed by exactly one `advance`, so between turns
/// `responses().len() == current_index()`.
#[derive(Debug, Clone)]
pub struct TurnController {
    catalog: Arc<Catalog>,
    current: Option<usize>,
    responses: Vec<ResponseRecord>,
}

impl TurnController {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            current: None,
            responses: Vec::new(),
        }
    }

    /// Point at the first question. Idempotent.
    pub fn start(&mut self) {
        if self.current.is_none() {
            self.current = Some(0);
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// `None` until started.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// The question awaiting an answer, if any.
    pub fn current_question(&self) -> Option<&Question> {
        self.current.and_then(|i| self.catalog.get(i))
    }

    pub fn is_exhausted(&self) -> bool {
        self.current.is_some_and(|i| i >= self.catalog.len())
    }

    pub fn responses(&self) -> &[ResponseRecord] {
        &self.responses
    }

    /// Append the response to the current question.
    pub(crate) fn record(&mut self, record: ResponseRecord) {
        self.responses.push(record);
    }

    /// Move past the current question, returning the new index.
    pub fn advance(&mut self) -> Result<usize, TurnError> {
        let index = self.current.ok_or(TurnError::NotStarted)?;
        let len = self.catalog.len();
        if index >= len {
            return Err(TurnError::Exhausted { index, len });
        }
        self.current = Some(index + 1);
        Ok(index + 1)
    }

    /// Display status of the question at `position`.
    pub fn status_of(&self, position: usize) -> QuestionStatus {
        match self.current {
            None => QuestionStatus::Pending,
            Some(current) if position < current => QuestionStatus::Completed,
            Some(current) if position == current => QuestionStatus::Current,
            Some(_) => QuestionStatus::Pending,
        }
    }

    /// Status of every catalog position, in order.
    pub fn statuses(&self) -> Vec<QuestionStatus> {
        (0..self.catalog.len()).map(|i| self.status_of(i)).collect()
    }

    /// `(answered, total)` for progress display.
    pub fn progress(&self) -> (usize, usize) {
        (self.responses.len(), self.catalog.len())
    }
}
