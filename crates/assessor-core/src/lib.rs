//! Interview session engine, keyword scoring, and reporting.
//!
//! This crate defines the data model, the Session Store contract, and the
//! state machine that takes a respondent from greeting to final report.

pub mod catalog;
pub mod error;
pub mod model;
pub mod report;
pub mod scoring;
pub mod session;
pub mod store;
pub mod timer;
pub mod turn;

pub use catalog::Catalog;
pub use error::{PersistenceError, PolicyError, SessionError, TurnError, ValidationError};
pub use session::{InterviewSession, SessionConfig, SessionContext};
pub use store::{SessionHandle, SessionStore};
