//! oncourse reconstructs clinically meaningful treatment courses from
//! heterogeneous, partially-overlapping clinical event sources.
//!
//! The pipeline per subject: normalize raw rows per source, classify
//! records against curated keyword dictionaries, merge all sources into
//! one chronological stream with provenance, reconstruct courses under
//! milestone and session-clustering regimes, then compute derived
//! attributes. Everything downstream of fetching is a pure function of
//! its inputs; the engine performs no file or network I/O.

pub mod classify;
pub mod config;
pub mod courses;
pub mod engine;
pub mod errors;
pub mod export;
pub mod merge;
pub mod models;
pub mod sources;
pub mod summary;
pub mod vocabulary;

pub use classify::Classifier;
pub use config::{init_tracing, EngineConfig, DEFAULT_GAP_THRESHOLD_DAYS};
pub use courses::{reconstruct_courses, Reconstruction};
pub use engine::{run_subject, run_subjects, SourceCollaborator, SubjectRequest, SubjectResult};
pub use errors::EngineError;
pub use export::{courses_table, records_table, summary_table, Table};
pub use merge::{merge_subject_records, LogicalEvent, MergedStream};
pub use models::{
    CodedTerm, Course, CourseWarning, DoseValue, NormalizedRecord, RawRow, SourceKind,
    SubjectOutcome, SubjectSummary, Tag, TaggedRecord,
};
pub use sources::{adapter_for, SourceAdapter};
pub use summary::{age_at_event_days, summarize};
pub use vocabulary::Vocabulary;
