//! End-to-end session lifecycle tests.
//!
//! Drive full assessments through `SessionContext` against the in-memory
//! store, including injected persistence failures and concurrent starts.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assessor_core::catalog::Catalog;
use assessor_core::model::{
    Difficulty, Message, Question, QuestionStatus, ResponseRecord, SessionPhase, Speaker,
};
use assessor_core::report::{AssessmentReport, ScoreBand};
use assessor_core::scoring::FeedbackTier;
use assessor_core::session::{Eligibility, SessionConfig, SessionContext, SessionObserver};
use assessor_core::store::{SessionHandle, SessionRecord, SessionStatus};
use assessor_core::{PersistenceError, PolicyError, SessionError, ValidationError};
use assessor_store::{MemoryStore, StoreOp};

fn question(id: &str, category: &str, phrases: &[&str]) -> Question {
    Question {
        id: id.into(),
        category: category.into(),
        difficulty: Difficulty::Intermediate,
        prompt: format!("Question {id}?"),
        expected_keyword_phrases: phrases.iter().map(|p| p.to_string()).collect(),
    }
}

/// Two questions: `ANSWER_80` scores 80 on the first, `ANSWER_40` scores 40
/// on the second.
fn two_question_catalog() -> Catalog {
    Catalog {
        id: "excel".into(),
        name: "Excel Skills Assessment".into(),
        description: String::new(),
        questions: vec![
            question(
                "q1",
                "Formulas",
                &["alpha", "beta", "gamma", "delta kappa lambda sigma omega"],
            ),
            question("q2", "Charts", &["red", "green blue white orange pink"]),
        ],
    }
}

const ANSWER_80: &str = "alpha beta gamma delta";
const ANSWER_40: &str = "red green blue white";

fn empty_catalog() -> Catalog {
    Catalog {
        questions: Vec::new(),
        ..two_question_catalog()
    }
}

fn context(store: &Arc<MemoryStore>, catalog: Catalog) -> SessionContext {
    SessionContext::new(store.clone(), catalog, SessionConfig::immediate())
}

#[derive(Default)]
struct RecordingObserver {
    messages: Mutex<Vec<Speaker>>,
    tiers: Mutex<Vec<FeedbackTier>>,
    completed: Mutex<Option<f64>>,
}

impl SessionObserver for RecordingObserver {
    fn on_message(&self, message: &Message) {
        self.messages.lock().unwrap().push(message.speaker);
    }

    fn on_response_scored(&self, _: &Question, _: &ResponseRecord, tier: FeedbackTier) {
        self.tiers.lock().unwrap().push(tier);
    }

    fn on_complete(&self, report: &AssessmentReport) {
        *self.completed.lock().unwrap() = Some(report.overall_score);
    }
}

#[tokio::test]
async fn full_session_scores_and_persists() {
    let store = Arc::new(MemoryStore::default());
    let ctx = context(&store, two_question_catalog());

    let mut session = ctx.start_session("cand-1").await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Active);
    assert_eq!(session.current_question().unwrap().id, "q1");
    assert_eq!(session.transcript().len(), 2);
    assert_eq!(store.session_count(), 1);

    let record = store.record(session.handle()).unwrap();
    assert_eq!(record.status, SessionStatus::InProgress);
    assert_eq!(record.total_questions, 2);

    let first = session.submit_response(ANSWER_80).await.unwrap();
    assert_eq!(first.record.score, 80);
    assert_eq!(first.tier, FeedbackTier::Strong);
    assert_eq!(first.next_question.unwrap().id, "q2");
    assert!(!first.completed);

    let state = session.state();
    assert_eq!(state.current_question_index, Some(1));
    assert_eq!(state.responses.len(), 1);
    assert_eq!(
        session.question_statuses(),
        vec![QuestionStatus::Completed, QuestionStatus::Current]
    );

    let second = session.submit_response(ANSWER_40).await.unwrap();
    assert_eq!(second.record.score, 40);
    assert_eq!(second.tier, FeedbackTier::Partial);
    assert!(second.next_question.is_none());
    assert!(second.completed);

    assert_eq!(session.phase(), SessionPhase::Completed);
    assert!(session.current_question().is_none());

    let report = session.report().unwrap();
    assert!((report.overall_score - 60.0).abs() < f64::EPSILON);
    assert_eq!(report.band, ScoreBand::Fair);
    assert_eq!(report.category_averages.len(), 2);
    assert_eq!(report.category_averages[0].category, "Formulas");

    let record = store.record(session.handle()).unwrap();
    assert_eq!(record.status, SessionStatus::Completed);
    assert_eq!(record.current_question_index, 2);
    assert_eq!(record.responses.len(), 2);
    assert!((record.overall_score.unwrap() - 60.0).abs() < f64::EPSILON);
    assert!(record.feedback.unwrap().contains("Overall performance: 60%"));

    // greeting, q1, answer, feedback, q2, answer, feedback, closing
    let speakers: Vec<Speaker> = session.transcript().iter().map(|m| m.speaker).collect();
    assert_eq!(
        speakers,
        vec![
            Speaker::Asker,
            Speaker::Asker,
            Speaker::Respondent,
            Speaker::Asker,
            Speaker::Asker,
            Speaker::Respondent,
            Speaker::Asker,
            Speaker::Asker,
        ]
    );
}

#[tokio::test]
async fn feedback_tier_follows_unrounded_score() {
    let catalog = Catalog {
        questions: vec![question(
            "near",
            "Formulas",
            &["b1", "b2", "a1 a2 a3 a4 a5 a6 a7 a8 a9 a10 a11 x1 x2 x3"],
        )],
        ..two_question_catalog()
    };
    let store = Arc::new(MemoryStore::default());
    let ctx = context(&store, catalog);

    let mut session = ctx.start_session("cand-near").await.unwrap();
    let outcome = session
        .submit_response("b1 b2 a1 a2 a3 a4 a5 a6 a7 a8 a9 a10 a11")
        .await
        .unwrap();

    // 69.64 is stored as 70 but still earns partial feedback
    assert_eq!(outcome.record.score, 70);
    assert_eq!(outcome.tier, FeedbackTier::Partial);
    let feedback = session
        .transcript()
        .iter()
        .rev()
        .find(|m| m.text == FeedbackTier::Partial.message());
    assert!(feedback.is_some());

    let record = store.record(session.handle()).unwrap();
    assert_eq!(record.responses[0].score, 70);
}

#[tokio::test]
async fn blank_answer_is_rejected_without_side_effects() {
    let store = Arc::new(MemoryStore::default());
    let ctx = context(&store, two_question_catalog());
    let mut session = ctx.start_session("cand-1").await.unwrap();
    let calls_before = store.call_count();

    let err = session.submit_response("   \n\t").await.unwrap_err();
    assert_eq!(err, SessionError::Validation(ValidationError::EmptyResponse));
    assert!(!err.is_fatal());

    assert_eq!(session.transcript().len(), 2);
    assert!(session.responses().is_empty());
    assert_eq!(session.state().current_question_index, Some(0));
    assert_eq!(store.call_count(), calls_before);
}

#[tokio::test]
async fn answers_are_trimmed_before_scoring() {
    let store = Arc::new(MemoryStore::default());
    let ctx = context(&store, two_question_catalog());
    let mut session = ctx.start_session("cand-1").await.unwrap();

    let outcome = session
        .submit_response(&format!("  {ANSWER_80}  \n"))
        .await
        .unwrap();
    assert_eq!(outcome.record.response_text, ANSWER_80);
    assert_eq!(outcome.record.score, 80);
}

#[tokio::test]
async fn empty_catalog_completes_immediately() {
    let store = Arc::new(MemoryStore::default());
    let ctx = context(&store, empty_catalog());

    let mut session = ctx.start_session("cand-1").await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Completed);
    assert_eq!(session.transcript().len(), 2);

    let report = session.report().unwrap();
    assert_eq!(report.overall_score, 0.0);
    assert!(report.responses.is_empty());

    let record = store.record(session.handle()).unwrap();
    assert_eq!(record.status, SessionStatus::Completed);
    assert_eq!(record.overall_score, Some(0.0));

    let err = session.submit_response("late answer").await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Policy(PolicyError::NotActive {
            phase: SessionPhase::Completed
        })
    ));
}

#[tokio::test]
async fn completed_respondent_cannot_start_again() {
    let store = Arc::new(MemoryStore::default());
    let ctx = context(&store, two_question_catalog());

    {
        let mut session = ctx.start_session("cand-1").await.unwrap();
        session.submit_response(ANSWER_80).await.unwrap();
        session.submit_response(ANSWER_40).await.unwrap();
    }

    match ctx.check_eligibility("cand-1").await.unwrap() {
        Eligibility::AlreadyCompleted(summary) => {
            assert!((summary.overall_score - 60.0).abs() < f64::EPSILON)
        }
        Eligibility::Eligible => panic!("expected a completed session"),
    }

    let err = ctx.start_session("cand-1").await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Policy(PolicyError::AlreadyCompleted { .. })
    ));
    assert_eq!(store.session_count(), 1);

    // Other respondents are unaffected.
    assert!(ctx.start_session("cand-2").await.is_ok());
}

#[tokio::test]
async fn previously_completed_record_blocks_start() {
    let store = Arc::new(MemoryStore::default());
    let mut record = SessionRecord::new(SessionHandle::new("old"), "cand-1", 5);
    record.complete(72.0, "done");
    store.insert_record(record);

    let ctx = context(&store, two_question_catalog());
    let err = ctx.start_session("cand-1").await.unwrap_err();
    match err {
        SessionError::Policy(PolicyError::AlreadyCompleted { summary, .. }) => {
            assert!((summary.overall_score - 72.0).abs() < f64::EPSILON)
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.session_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_starts_create_one_session() {
    let store = Arc::new(MemoryStore::default().with_create_delay(Duration::from_millis(100)));
    let ctx = context(&store, two_question_catalog());

    let (a, b) = tokio::join!(ctx.start_session("cand-1"), ctx.start_session("cand-1"));

    let (ok, err) = match (a, b) {
        (Ok(session), Err(e)) | (Err(e), Ok(session)) => (session, e),
        (a, b) => panic!("expected exactly one start to succeed: {:?} / {:?}", a.is_ok(), b.is_ok()),
    };
    assert!(matches!(
        err,
        SessionError::Policy(PolicyError::SessionInProgress { .. })
    ));
    assert_eq!(ok.phase(), SessionPhase::Active);
    assert_eq!(store.session_count(), 1);
    assert!(ctx.has_live_session("cand-1"));
}

#[tokio::test]
async fn abandoned_session_releases_the_respondent() {
    let store = Arc::new(MemoryStore::default());
    let ctx = context(&store, two_question_catalog());

    let session = ctx.start_session("cand-1").await.unwrap();
    assert!(ctx.has_live_session("cand-1"));
    drop(session);
    assert!(!ctx.has_live_session("cand-1"));

    let session = ctx.start_session("cand-1").await.unwrap();
    assert_eq!(session.current_question().unwrap().id, "q1");
    let records = store.records_for("cand-1");
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.status == SessionStatus::InProgress));
}

#[tokio::test]
async fn create_failure_is_fatal() {
    let store = Arc::new(MemoryStore::default());
    store.fail_on(StoreOp::CreateSession);
    let ctx = context(&store, two_question_catalog());

    let err = ctx.start_session("cand-1").await.unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        SessionError::Persistence(PersistenceError::Unavailable(_))
    ));
    assert_eq!(store.session_count(), 0);
    assert!(!ctx.has_live_session("cand-1"));
}

#[tokio::test]
async fn eligibility_failure_blocks_start() {
    let store = Arc::new(MemoryStore::default());
    store.fail_on(StoreOp::FindCompleted);
    let ctx = context(&store, two_question_catalog());

    let err = ctx.start_session("cand-1").await.unwrap_err();
    assert!(matches!(err, SessionError::Persistence(_)));
    assert_eq!(store.session_count(), 0);
}

#[tokio::test]
async fn per_answer_write_failures_do_not_stop_the_session() {
    let store = Arc::new(MemoryStore::default());
    let ctx = context(&store, two_question_catalog());
    let mut session = ctx.start_session("cand-1").await.unwrap();

    store.fail_on(StoreOp::RecordResponse);
    store.fail_on(StoreOp::UpdateProgress);
    let outcome = session.submit_response(ANSWER_80).await.unwrap();
    assert_eq!(outcome.record.score, 80);
    assert_eq!(session.responses().len(), 1);
    assert_eq!(session.current_question().unwrap().id, "q2");

    let record = store.record(session.handle()).unwrap();
    assert!(record.responses.is_empty());
    assert_eq!(record.current_question_index, 0);

    store.clear_failures();
    session.submit_response(ANSWER_40).await.unwrap();
    let record = store.record(session.handle()).unwrap();
    assert_eq!(record.responses.len(), 1);
    assert_eq!(record.status, SessionStatus::Completed);
}

#[tokio::test]
async fn completion_write_failure_still_completes_locally() {
    let store = Arc::new(MemoryStore::default());
    let ctx = context(&store, two_question_catalog());
    let mut session = ctx.start_session("cand-1").await.unwrap();

    store.fail_on(StoreOp::CompleteSession);
    session.submit_response(ANSWER_80).await.unwrap();
    session.submit_response(ANSWER_40).await.unwrap();

    assert_eq!(session.phase(), SessionPhase::Completed);
    assert!(session.report().is_some());
    let record = store.record(session.handle()).unwrap();
    assert_eq!(record.status, SessionStatus::InProgress);
}

#[tokio::test]
async fn observer_sees_every_step() {
    let store = Arc::new(MemoryStore::default());
    let observer = Arc::new(RecordingObserver::default());
    let ctx = context(&store, two_question_catalog()).with_observer(observer.clone());

    let mut session = ctx.start_session("cand-1").await.unwrap();
    session.submit_response(ANSWER_80).await.unwrap();
    session.submit_response("nothing relevant").await.unwrap();

    assert_eq!(observer.messages.lock().unwrap().len(), session.transcript().len());
    assert_eq!(
        *observer.tiers.lock().unwrap(),
        vec![FeedbackTier::Strong, FeedbackTier::Redirect]
    );
    assert_eq!(*observer.completed.lock().unwrap(), Some(40.0));
}

#[tokio::test(start_paused = true)]
async fn presentational_delays_are_applied() {
    let store = Arc::new(MemoryStore::default());
    let ctx = SessionContext::new(store.clone(), two_question_catalog(), SessionConfig::default());

    let started = tokio::time::Instant::now();
    let mut session = ctx.start_session("cand-1").await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(2000));

    let before_answer = tokio::time::Instant::now();
    session.submit_response(ANSWER_80).await.unwrap();
    assert!(before_answer.elapsed() >= Duration::from_millis(2500));
}

#[tokio::test(start_paused = true)]
async fn elapsed_ticker_stops_when_session_completes() {
    let store = Arc::new(MemoryStore::default());
    let ctx = context(&store, two_question_catalog());
    let mut session = ctx.start_session("cand-1").await.unwrap();

    let mut ticker = session.spawn_elapsed_ticker().unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!ticker.is_finished());

    session.submit_response(ANSWER_80).await.unwrap();
    session.submit_response(ANSWER_40).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), ticker.join())
        .await
        .unwrap();
    assert!(ticker.is_finished());
}
