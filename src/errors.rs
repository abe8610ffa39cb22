use chrono::NaiveDate;
use thiserror::Error;

use crate::models::enums::SourceKind;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Source unavailable: {kind} ({reason})")]
    SourceUnavailable { kind: SourceKind, reason: String },

    #[error("Invalid date: event {event_date} precedes birth date {birth_date}")]
    InvalidDate {
        birth_date: NaiveDate,
        event_date: NaiveDate,
    },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Vocabulary parse error: {0}")]
    VocabularyParse(#[from] serde_json::Error),
}
