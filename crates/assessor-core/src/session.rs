//! Session lifecycle manager.
//!
//! Drives one respondent through the catalog: start, per-answer turns, and
//! completion. Persistence goes through [`SessionStore`]; only session
//! creation failures stop the conversation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::catalog::Catalog;
use crate::error::{PersistenceError, PolicyError, SessionError, ValidationError};
use crate::model::{
    Message, Question, QuestionStatus, ResponseRecord, SessionPhase, SessionState,
};
use crate::report::{generate_report, overall_score, AssessmentReport, ScoredResponse};
use crate::scoring::{self, FeedbackTier};
use crate::store::{SessionHandle, SessionStore, SessionSummary};
use crate::timer::{self, ElapsedTicker};
use crate::turn::TurnController;

/// Configuration for interview sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name the asker introduces itself with.
    pub interviewer_name: String,
    /// Pause between the greeting and the first question.
    pub greeting_delay: Duration,
    /// Pause before the asker replies to an answer.
    pub feedback_delay: Duration,
    /// Pause between feedback and the next question.
    pub next_question_delay: Duration,
    /// Refresh period of the elapsed-time display.
    pub tick_period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interviewer_name: "Alex".into(),
            greeting_delay: Duration::from_millis(2000),
            feedback_delay: Duration::from_millis(1000),
            next_question_delay: Duration::from_millis(1500),
            tick_period: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    /// Default configuration with every presentational delay removed.
    pub fn immediate() -> Self {
        Self {
            greeting_delay: Duration::ZERO,
            feedback_delay: Duration::ZERO,
            next_question_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Observer for session progress.
pub trait SessionObserver: Send + Sync {
    fn on_message(&self, message: &Message);
    fn on_response_scored(&self, question: &Question, record: &ResponseRecord, tier: FeedbackTier);
    fn on_complete(&self, report: &AssessmentReport);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_message(&self, _: &Message) {}
    fn on_response_scored(&self, _: &Question, _: &ResponseRecord, _: FeedbackTier) {}
    fn on_complete(&self, _: &AssessmentReport) {}
}

/// Result of the pre-start lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Eligibility {
    Eligible,
    AlreadyCompleted(SessionSummary),
}

/// What a caller may offer a respondent before starting.
#[derive(Debug, Clone, PartialEq)]
pub enum StartAvailability {
    /// The eligibility lookup has not resolved; do not offer the start action.
    Checking,
    Available,
    Blocked(SessionSummary),
}

impl From<Eligibility> for StartAvailability {
    fn from(eligibility: Eligibility) -> Self {
        match eligibility {
            Eligibility::Eligible => StartAvailability::Available,
            Eligibility::AlreadyCompleted(summary) => StartAvailability::Blocked(summary),
        }
    }
}

/// Respondents with a live session in this process.
#[derive(Debug, Default, Clone)]
struct LiveRegistry(Arc<Mutex<HashSet<String>>>);

impl LiveRegistry {
    fn acquire(&self, respondent_id: &str) -> Option<LiveGuard> {
        let mut live = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if !live.insert(respondent_id.to_string()) {
            return None;
        }
        Some(LiveGuard {
            registry: self.clone(),
            respondent_id: respondent_id.to_string(),
        })
    }

    fn contains(&self, respondent_id: &str) -> bool {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(respondent_id)
    }
}

/// Releases the respondent's live slot on drop.
#[derive(Debug)]
struct LiveGuard {
    registry: LiveRegistry,
    respondent_id: String,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.registry
            .0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.respondent_id);
    }
}

/// Owns the catalog, store, and configuration shared by sessions.
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    catalog: Arc<Catalog>,
    config: SessionConfig,
    observer: Arc<dyn SessionObserver>,
    live: LiveRegistry,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>, catalog: Catalog, config: SessionConfig) -> Self {
        Self {
            store,
            catalog: Arc::new(catalog),
            config,
            observer: Arc::new(NoopObserver),
            live: LiveRegistry::default(),
        }
    }

    /// Build a context whose catalog is the store's active questions.
    pub async fn from_store(
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Result<Self, PersistenceError> {
        let questions = store.load_active_questions().await?;
        tracing::info!(
            "loaded {} active questions from {} store",
            questions.len(),
            store.name()
        );
        Ok(Self::new(store, Catalog::from_questions(questions), config))
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the respondent has a session live in this process.
    pub fn has_live_session(&self, respondent_id: &str) -> bool {
        self.live.contains(respondent_id)
    }

    /// Look up whether the respondent may start an assessment.
    pub async fn check_eligibility(
        &self,
        respondent_id: &str,
    ) -> Result<Eligibility, PersistenceError> {
        match self.store.find_completed_session(respondent_id).await? {
            Some(summary) => Ok(Eligibility::AlreadyCompleted(summary)),
            None => Ok(Eligibility::Eligible),
        }
    }

    /// Start an assessment for the respondent.
    ///
    /// Rejected if the store holds a completed session for them or another
    /// session for them is live in this process. Nothing is persisted when
    /// the store cannot create the session record.
    pub async fn start_session(
        &self,
        respondent_id: &str,
    ) -> Result<InterviewSession, SessionError> {
        let live = self
            .live
            .acquire(respondent_id)
            .ok_or_else(|| PolicyError::SessionInProgress {
                respondent_id: respondent_id.to_string(),
            })?;

        if let Eligibility::AlreadyCompleted(summary) =
            self.check_eligibility(respondent_id).await?
        {
            tracing::info!("respondent {respondent_id} already completed an assessment");
            return Err(PolicyError::AlreadyCompleted {
                respondent_id: respondent_id.to_string(),
                summary,
            }
            .into());
        }

        let handle = self
            .store
            .create_session(respondent_id, self.catalog.len())
            .await?;
        tracing::info!(
            "session {handle} started for {respondent_id} ({} questions)",
            self.catalog.len()
        );

        let mut session = InterviewSession {
            respondent_id: respondent_id.to_string(),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            observer: Arc::clone(&self.observer),
            turns: TurnController::new(Arc::clone(&self.catalog)),
            phase: SessionPhase::Idle,
            started_at: None,
            handle,
            transcript: Vec::new(),
            report: None,
            phase_tx: watch::Sender::new(SessionPhase::Idle),
            _live: live,
        };
        session.begin().await;
        Ok(session)
    }
}

/// What happened on one answered turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub record: ResponseRecord,
    pub tier: FeedbackTier,
    /// The question asked next, if any.
    pub next_question: Option<Question>,
    pub completed: bool,
}

/// A live session for one respondent.
///
/// Taking `&mut self` for answers serializes turns: a second submission
/// cannot interleave with one in flight.
pub struct InterviewSession {
    respondent_id: String,
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
    observer: Arc<dyn SessionObserver>,
    turns: TurnController,
    phase: SessionPhase,
    started_at: Option<DateTime<Utc>>,
    handle: SessionHandle,
    transcript: Vec<Message>,
    report: Option<AssessmentReport>,
    phase_tx: watch::Sender<SessionPhase>,
    _live: LiveGuard,
}

impl std::fmt::Debug for InterviewSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterviewSession")
            .field("respondent_id", &self.respondent_id)
            .field("handle", &self.handle)
            .field("phase", &self.phase)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

impl InterviewSession {
    async fn begin(&mut self) {
        self.started_at = Some(Utc::now());
        self.turns.start();
        self.set_phase(SessionPhase::Active);

        let greeting = greeting_text(
            &self.config.interviewer_name,
            &self.turns.catalog().name,
            self.turns.catalog().len(),
        );
        self.push_message(Message::asker(greeting));

        if self.turns.is_exhausted() {
            tracing::warn!("session {} has an empty catalog", self.handle);
            self.complete().await;
            return;
        }

        pause(self.config.greeting_delay).await;
        self.ask_current();
    }

    /// Answer the current question.
    pub async fn submit_response(&mut self, text: &str) -> Result<TurnOutcome, SessionError> {
        if self.phase != SessionPhase::Active {
            return Err(PolicyError::NotActive { phase: self.phase }.into());
        }
        let answer = text.trim();
        if answer.is_empty() {
            return Err(ValidationError::EmptyResponse.into());
        }
        let Some(question) = self.turns.current_question().cloned() else {
            return Err(PolicyError::NotActive { phase: self.phase }.into());
        };

        self.push_message(Message::respondent(answer));

        let (raw, score) = scoring::scored(question.expected_keyword_phrases.as_slice(), answer);
        let record = ResponseRecord {
            question_id: question.id.clone(),
            response_text: answer.to_string(),
            score,
        };
        self.turns.record(record.clone());
        tracing::debug!("question {} scored {score}", question.id);

        if let Err(e) = self
            .store
            .record_response(&self.handle, &question.id, answer, score)
            .await
        {
            tracing::warn!(
                "failed to persist response to {} for session {}: {e}",
                question.id,
                self.handle
            );
        }

        let next_index = self.turns.advance().unwrap_or_else(|e| {
            tracing::error!("turn controller out of step: {e}");
            self.turns.responses().len()
        });

        if let Err(e) = self.store.update_progress(&self.handle, next_index).await {
            tracing::warn!("failed to persist progress for session {}: {e}", self.handle);
        }

        let tier = FeedbackTier::for_raw(raw);
        self.observer.on_response_scored(&question, &record, tier);
        pause(self.config.feedback_delay).await;
        self.push_message(Message::asker(tier.message()));

        if self.turns.is_exhausted() {
            self.complete().await;
        } else {
            pause(self.config.next_question_delay).await;
            self.ask_current();
        }

        Ok(TurnOutcome {
            record,
            tier,
            next_question: self.current_question().cloned(),
            completed: self.phase == SessionPhase::Completed,
        })
    }

    async fn complete(&mut self) {
        let overall = overall_score(self.turns.responses());
        let summary = closing_text(&self.turns.catalog().name, overall);
        self.set_phase(SessionPhase::Completed);

        if let Err(e) = self
            .store
            .complete_session(&self.handle, overall, &summary)
            .await
        {
            tracing::warn!("failed to persist completion of session {}: {e}", self.handle);
        }

        pause(self.config.feedback_delay).await;
        self.push_message(Message::asker(summary));

        let responses = ScoredResponse::enrich(self.turns.responses(), self.turns.catalog());
        let report = generate_report(&self.respondent_id, Some(self.handle.clone()), responses);
        tracing::info!(
            "session {} completed: {:.1}% ({})",
            self.handle,
            report.overall_score,
            report.band
        );
        self.observer.on_complete(&report);
        self.report = Some(report);
    }

    fn ask_current(&mut self) {
        if let Some(prompt) = self.turns.current_question().map(|q| q.prompt.clone()) {
            self.push_message(Message::asker(prompt));
        }
    }

    fn push_message(&mut self, message: Message) {
        self.observer.on_message(&message);
        self.transcript.push(message);
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.phase_tx.send_replace(phase);
    }

    pub fn respondent_id(&self) -> &str {
        &self.respondent_id
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn catalog(&self) -> &Catalog {
        self.turns.catalog()
    }

    pub fn turns(&self) -> &TurnController {
        &self.turns
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            SessionPhase::Active => self.turns.current_question(),
            _ => None,
        }
    }

    pub fn responses(&self) -> &[ResponseRecord] {
        self.turns.responses()
    }

    /// The transcript, in emission order.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn question_statuses(&self) -> Vec<QuestionStatus> {
        self.turns.statuses()
    }

    /// Snapshot of the session state.
    pub fn state(&self) -> SessionState {
        SessionState {
            phase: self.phase,
            current_question_index: self.turns.current_index(),
            started_at: self.started_at,
            responses: self.turns.responses().to_vec(),
            session_ref: Some(self.handle.clone()),
        }
    }

    /// The final report, once completed.
    pub fn report(&self) -> Option<&AssessmentReport> {
        self.report.as_ref()
    }

    /// Watch phase transitions.
    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase_tx.subscribe()
    }

    /// Elapsed time as `m:ss` relative to `now`.
    pub fn elapsed_display(&self, now: DateTime<Utc>) -> String {
        let elapsed = self
            .started_at
            .map(|started| timer::elapsed(now, started))
            .unwrap_or(Duration::ZERO);
        timer::format_elapsed(elapsed)
    }

    /// Spawn a ticker refreshing the elapsed display until the session leaves `active`.
    pub fn spawn_elapsed_ticker(&self) -> Option<ElapsedTicker> {
        let started_at = self.started_at?;
        Some(ElapsedTicker::spawn(
            started_at,
            self.subscribe_phase(),
            self.config.tick_period,
        ))
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn greeting_text(interviewer: &str, catalog_name: &str, question_count: usize) -> String {
    format!(
        "Hello! I'm {interviewer}, and I'll be your interviewer for the {catalog_name}.\n\n\
         I'll ask you {question_count} question{} covering the topics in this assessment. \
         Please answer as thoroughly as you can, in your own words.",
        if question_count == 1 { "" } else { "s" }
    )
}

/// The closing message, also persisted as the session's feedback text.
pub fn closing_text(catalog_name: &str, overall: f64) -> String {
    format!(
        "Thank you for completing the {catalog_name}!\n\n\
         Based on your responses, here's a brief summary:\n\
         - Overall performance: {:.0}%\n\
         - Strengths: you showed a good understanding of the basic concepts\n\
         - Areas for improvement: consider exploring more advanced techniques\n\n\
         A detailed report has been generated. Thank you for your time!",
        overall
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_config_has_no_delays() {
        let config = SessionConfig::immediate();
        assert!(config.greeting_delay.is_zero());
        assert!(config.feedback_delay.is_zero());
        assert!(config.next_question_delay.is_zero());
        assert_eq!(config.interviewer_name, "Alex");
    }

    #[test]
    fn live_registry_admits_one_session_per_respondent() {
        let registry = LiveRegistry::default();
        let guard = registry.acquire("r-1").unwrap();
        assert!(registry.acquire("r-1").is_none());
        assert!(registry.acquire("r-2").is_some());

        drop(guard);
        assert!(!registry.contains("r-1"));
        assert!(registry.acquire("r-1").is_some());
    }

    #[test]
    fn eligibility_maps_to_availability() {
        assert_eq!(
            StartAvailability::from(Eligibility::Eligible),
            StartAvailability::Available
        );
        let summary = SessionSummary {
            completed_at: Utc::now(),
            overall_score: 55.0,
        };
        assert_eq!(
            StartAvailability::from(Eligibility::AlreadyCompleted(summary.clone())),
            StartAvailability::Blocked(summary)
        );
    }

    #[test]
    fn closing_text_rounds_score() {
        let text = closing_text("Excel Skills Assessment", 66.666);
        assert!(text.contains("Excel Skills Assessment"));
        assert!(text.contains("Overall performance: 67%"));
    }

    #[test]
    fn greeting_pluralizes() {
        assert!(greeting_text("Alex", "Quiz", 1).contains("1 question covering"));
        assert!(greeting_text("Alex", "Quiz", 5).contains("5 questions covering"));
    }
}
