use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::enums::SourceKind;

/// Derived rollups for one subject, computed from the reconstructed
/// course list plus the tagged-record stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub consultation_count: u32,
    pub session_count: u32,
    pub course_count: u32,
    /// Union of modalities across all courses.
    pub modalities: BTreeSet<String>,
    pub any_retreatment: bool,
    /// Age at the first course's start, in whole days. None when the
    /// birth date is unknown or the age computation failed.
    pub age_at_first_course_days: Option<i64>,
}

/// Per-subject run outcome. Every run produces exactly one of these per
/// subject; a subject is never silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectOutcome {
    /// All sources responded and the pipeline ran clean.
    Full,
    /// Some sources were unavailable or warnings were recorded.
    Partial { problems: Vec<String> },
    /// No usable records survived normalization.
    Empty { reason: String },
}

/// Sources that failed for a subject, kept for the outcome report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub kind: SourceKind,
    pub reason: String,
}
