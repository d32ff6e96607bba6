pub mod config;
pub mod emergency;
pub mod engine;
pub mod error;
pub mod keywords;
pub mod models;
pub mod persistence;
pub mod protocol;
pub mod scoring;
pub mod validators;

pub use config::TriageConfig;
pub use emergency::{EmergencyOutcome, EmergencyReason};
pub use engine::{CallSession, Evaluation, TriageEngine};
pub use error::TriageError;
pub use keywords::{KeywordSet, Vocabulary};
pub use models::{CallRecord, SlotSet, SlotUpdate, SlotValue};
pub use persistence::{
    create_sink, Dispatcher, HandOff, HttpRecordSink, PersistenceError, RecordSink,
    SaveOutcome, SimulatedRecordSink,
};
pub use scoring::{ScoreBreakdown, ScoreCategory, ScoreOutcome};
pub use validators::{AnswerIssue, Question, SlotValidation};
