use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A reconstructed treatment course. References member records by
/// provenance key; the merger owns the canonical record set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// 1-based, assigned in chronological order of `start_date`.
    pub course_id: u32,
    pub start_date: NaiveDate,
    /// None while the course is open (unterminated); a valid terminal state.
    pub end_date: Option<NaiveDate>,
    /// `end_date - start_date`; None when `end_date` is unknown.
    pub duration_days: Option<i64>,
    /// Technique labels observed in member records. Empty when none found.
    pub modality_set: BTreeSet<String>,
    /// True when this course starts strictly after the previous course's
    /// end (or start, when the previous end is unknown).
    pub is_retreatment: bool,
    pub member_record_ids: Vec<String>,
    pub warnings: Vec<CourseWarning>,
}

impl Course {
    /// Last date with any evidence of activity in this course.
    pub fn last_activity(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }
}

/// Non-fatal reconstruction ambiguities, surfaced for audit rather than
/// resolved silently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseWarning {
    /// A course-start event arrived while a course was already open,
    /// within the fold-in gap window, and was folded into that course.
    AmbiguousBoundary {
        record_id: String,
        date: NaiveDate,
    },
    /// A course-end event arrived with no open course; it was not used
    /// for boundary inference.
    EndWithoutStart {
        record_id: String,
        date: NaiveDate,
    },
}
