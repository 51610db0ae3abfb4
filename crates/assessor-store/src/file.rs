//! JSON-file session store.
//!
//! Each session is one pretty-printed JSON file under `<dir>/sessions/`.
//! Questions come from an optional TOML catalog file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use assessor_core::catalog::parse_catalog;
use assessor_core::error::PersistenceError;
use assessor_core::model::Question;
use assessor_core::store::{
    SessionHandle, SessionRecord, SessionStore, SessionSummary, StoredResponse,
};

/// A session store backed by a directory of JSON files.
pub struct FileStore {
    dir: PathBuf,
    catalog: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            catalog: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Serve questions from a TOML catalog file.
    pub fn with_catalog(mut self, catalog: impl Into<PathBuf>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn sessions_dir(&self) -> PathBuf {
        self.dir.join("sessions")
    }

    fn record_path(&self, handle: &SessionHandle) -> PathBuf {
        self.sessions_dir().join(format!("{}.json", handle.as_str()))
    }

    async fn read_record(&self, handle: &SessionHandle) -> Result<SessionRecord, PersistenceError> {
        let path = self.record_path(handle);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::SessionNotFound(handle.clone()));
            }
            Err(e) => return Err(io_error(&path, e)),
        };
        serde_json::from_str(&content).map_err(|e| {
            PersistenceError::Serialization(format!("{}: {e}", path.display()))
        })
    }

    async fn write_record(&self, record: &SessionRecord) -> Result<(), PersistenceError> {
        let dir = self.sessions_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        let path = self.record_path(&record.handle);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&path, e))
    }

    async fn update_record(
        &self,
        handle: &SessionHandle,
        f: impl FnOnce(&mut SessionRecord) + Send,
    ) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.read_record(handle).await?;
        f(&mut record);
        self.write_record(&record).await
    }

    /// Every readable session record, in no particular order.
    ///
    /// Unreadable files are logged and skipped.
    pub async fn records(&self) -> Result<Vec<SessionRecord>, PersistenceError> {
        self.scan_records(false).await
    }

    /// Read every session file. With `strict`, an unparsable file is an error.
    async fn scan_records(&self, strict: bool) -> Result<Vec<SessionRecord>, PersistenceError> {
        let dir = self.sessions_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir, e)),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| io_error(&path, e))?;
            match serde_json::from_str::<SessionRecord>(&content) {
                Ok(record) => records.push(record),
                Err(e) if strict => {
                    return Err(PersistenceError::Serialization(format!(
                        "{}: {e}",
                        path.display()
                    )));
                }
                Err(e) => tracing::warn!("skipping unreadable session {}: {e}", path.display()),
            }
        }
        Ok(records)
    }
}

fn io_error(path: &Path, e: std::io::Error) -> PersistenceError {
    PersistenceError::Io(format!("{}: {e}", path.display()))
}

#[async_trait]
impl SessionStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load_active_questions(&self) -> Result<Vec<Question>, PersistenceError> {
        let path = self
            .catalog
            .as_ref()
            .ok_or(PersistenceError::CatalogNotConfigured)?;
        let catalog = parse_catalog(path).map_err(|e| PersistenceError::Io(format!("{e:#}")))?;
        Ok(catalog.questions)
    }

    async fn find_completed_session(
        &self,
        respondent_id: &str,
    ) -> Result<Option<SessionSummary>, PersistenceError> {
        // A corrupt file may be this respondent's completed session.
        Ok(self
            .scan_records(true)
            .await?
            .iter()
            .filter(|r| r.respondent_id == respondent_id)
            .filter_map(SessionRecord::summary)
            .max_by_key(|s| s.completed_at))
    }

    async fn create_session(
        &self,
        respondent_id: &str,
        total_questions: usize,
    ) -> Result<SessionHandle, PersistenceError> {
        let handle = SessionHandle::new(Uuid::new_v4().to_string());
        let record = SessionRecord::new(handle.clone(), respondent_id, total_questions);
        let _guard = self.write_lock.lock().await;
        self.write_record(&record).await?;
        tracing::debug!("created session file for {handle}");
        Ok(handle)
    }

    async fn record_response(
        &self,
        session: &SessionHandle,
        question_id: &str,
        response_text: &str,
        score: u8,
    ) -> Result<(), PersistenceError> {
        let response = StoredResponse {
            question_id: question_id.to_string(),
            response_text: response_text.to_string(),
            score,
            recorded_at: Utc::now(),
        };
        self.update_record(session, move |record| record.responses.push(response))
            .await
    }

    async fn update_progress(
        &self,
        session: &SessionHandle,
        current_question_index: usize,
    ) -> Result<(), PersistenceError> {
        self.update_record(session, move |record| {
            record.current_question_index = current_question_index;
        })
        .await
    }

    async fn complete_session(
        &self,
        session: &SessionHandle,
        overall_score: f64,
        feedback: &str,
    ) -> Result<(), PersistenceError> {
        let feedback = feedback.to_string();
        self.update_record(session, move |record| {
            record.complete(overall_score, &feedback)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assessor_core::store::SessionStatus;

    const CATALOG: &str = r#"
[catalog]
id = "tiny"
name = "Tiny"

[[questions]]
id = "q1"
prompt = "First?"
expected_keyword_phrases = ["first answer"]

[[questions]]
id = "q2"
prompt = "Hidden?"
active = false
"#;

    #[tokio::test]
    async fn session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let handle = {
            let store = FileStore::new(dir.path());
            let handle = store.create_session("r-1", 2).await.unwrap();
            store.record_response(&handle, "q1", "text", 25).await.unwrap();
            store.update_progress(&handle, 1).await.unwrap();
            handle
        };

        let store = FileStore::new(dir.path());
        let records = store.records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].handle, handle);
        assert_eq!(records[0].status, SessionStatus::InProgress);
        assert_eq!(records[0].current_question_index, 1);
        assert_eq!(records[0].responses[0].score, 25);
        assert!(store.find_completed_session("r-1").await.unwrap().is_none());

        store.complete_session(&handle, 25.0, "done").await.unwrap();
        let summary = store.find_completed_session("r-1").await.unwrap().unwrap();
        assert!((summary.overall_score - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn corrupt_record_fails_completed_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let handle = store.create_session("r-1", 1).await.unwrap();
        store.complete_session(&handle, 80.0, "done").await.unwrap();
        assert!(store.find_completed_session("r-1").await.unwrap().is_some());

        std::fs::write(store.record_path(&handle), "{ truncated").unwrap();

        let err = store.find_completed_session("r-1").await.unwrap_err();
        assert!(matches!(err, PersistenceError::Serialization(_)));
        // listing still skips it
        assert!(store.records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_directory_has_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("not-yet-created"));
        assert!(store.records().await.unwrap().is_empty());
        assert!(store.find_completed_session("anyone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let err = store
            .update_progress(&SessionHandle::new("nope"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn loads_active_questions_from_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("catalog.toml");
        std::fs::write(&catalog_path, CATALOG).unwrap();

        let store = FileStore::new(dir.path()).with_catalog(&catalog_path);
        let questions = store.load_active_questions().await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "q1");
    }

    #[tokio::test]
    async fn questions_require_a_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(
            store.load_active_questions().await.unwrap_err(),
            PersistenceError::CatalogNotConfigured
        );
    }
}
