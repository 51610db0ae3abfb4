//! In-memory session store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use assessor_core::error::PersistenceError;
use assessor_core::model::Question;
use assessor_core::store::{
    SessionHandle, SessionRecord, SessionStore, SessionSummary, StoredResponse,
};

/// A store operation, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    LoadQuestions,
    FindCompleted,
    CreateSession,
    RecordResponse,
    UpdateProgress,
    CompleteSession,
}

/// A session store that keeps everything in process memory.
///
/// Operations can be made to fail and session creation can be slowed,
/// which makes it the store of choice for exercising the lifecycle.
pub struct MemoryStore {
    questions: Vec<Question>,
    sessions: Mutex<HashMap<SessionHandle, SessionRecord>>,
    failing: Mutex<HashSet<StoreOp>>,
    create_delay: Duration,
    call_count: AtomicU32,
}

impl MemoryStore {
    /// Create a store serving the given active questions.
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            sessions: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            create_delay: Duration::ZERO,
            call_count: AtomicU32::new(0),
        }
    }

    /// Delay every `create_session` call.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    /// Make `op` fail with [`PersistenceError::Unavailable`] until cleared.
    pub fn fail_on(&self, op: StoreOp) {
        lock(&self.failing).insert(op);
    }

    pub fn clear_failures(&self) {
        lock(&self.failing).clear();
    }

    /// Insert a record directly, e.g. a previously completed session.
    pub fn insert_record(&self, record: SessionRecord) {
        lock(&self.sessions).insert(record.handle.clone(), record);
    }

    pub fn record(&self, handle: &SessionHandle) -> Option<SessionRecord> {
        lock(&self.sessions).get(handle).cloned()
    }

    /// All records for a respondent, oldest first.
    pub fn records_for(&self, respondent_id: &str) -> Vec<SessionRecord> {
        let mut records: Vec<SessionRecord> = lock(&self.sessions)
            .values()
            .filter(|r| r.respondent_id == respondent_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.started_at);
        records
    }

    pub fn session_count(&self) -> usize {
        lock(&self.sessions).len()
    }

    /// Number of store calls made.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    fn enter(&self, op: StoreOp) -> Result<(), PersistenceError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if lock(&self.failing).contains(&op) {
            return Err(PersistenceError::Unavailable(format!(
                "injected failure for {op:?}"
            )));
        }
        Ok(())
    }

    fn with_record<T>(
        &self,
        handle: &SessionHandle,
        f: impl FnOnce(&mut SessionRecord) -> T,
    ) -> Result<T, PersistenceError> {
        let mut sessions = lock(&self.sessions);
        let record = sessions
            .get_mut(handle)
            .ok_or_else(|| PersistenceError::SessionNotFound(handle.clone()))?;
        Ok(f(record))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl SessionStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_active_questions(&self) -> Result<Vec<Question>, PersistenceError> {
        self.enter(StoreOp::LoadQuestions)?;
        Ok(self.questions.clone())
    }

    async fn find_completed_session(
        &self,
        respondent_id: &str,
    ) -> Result<Option<SessionSummary>, PersistenceError> {
        self.enter(StoreOp::FindCompleted)?;
        Ok(lock(&self.sessions)
            .values()
            .filter(|r| r.respondent_id == respondent_id)
            .filter_map(SessionRecord::summary)
            .max_by_key(|s| s.completed_at))
    }

    async fn create_session(
        &self,
        respondent_id: &str,
        total_questions: usize,
    ) -> Result<SessionHandle, PersistenceError> {
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
        self.enter(StoreOp::CreateSession)?;
        let handle = SessionHandle::new(Uuid::new_v4().to_string());
        self.insert_record(SessionRecord::new(
            handle.clone(),
            respondent_id,
            total_questions,
        ));
        Ok(handle)
    }

    async fn record_response(
        &self,
        session: &SessionHandle,
        question_id: &str,
        response_text: &str,
        score: u8,
    ) -> Result<(), PersistenceError> {
        self.enter(StoreOp::RecordResponse)?;
        self.with_record(session, |record| {
            record.responses.push(StoredResponse {
                question_id: question_id.to_string(),
                response_text: response_text.to_string(),
                score,
                recorded_at: Utc::now(),
            });
        })
    }

    async fn update_progress(
        &self,
        session: &SessionHandle,
        current_question_index: usize,
    ) -> Result<(), PersistenceError> {
        self.enter(StoreOp::UpdateProgress)?;
        self.with_record(session, |record| {
            record.current_question_index = current_question_index;
        })
    }

    async fn complete_session(
        &self,
        session: &SessionHandle,
        overall_score: f64,
        feedback: &str,
    ) -> Result<(), PersistenceError> {
        self.enter(StoreOp::CompleteSession)?;
        self.with_record(session, |record| record.complete(overall_score, feedback))
    }
}
