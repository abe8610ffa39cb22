use crate::models::{NormalizedRecord, RawRow, SourceKind};

use super::{first_timestamp, join_narrative, str_field, SourceAdapter};

/// Per-visit encounter rows. Timestamp priority: explicit visit
/// datetime, then check-in time, then the bare visit date.
pub struct VisitRecordAdapter;

const TIMESTAMP_PRIORITY: [&str; 3] = ["visit_datetime", "checkin_time", "visit_date"];
const NARRATIVE_FIELDS: [&str; 4] = ["visit_type", "chief_complaint", "visit_note", "comments"];

impl SourceAdapter for VisitRecordAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::VisitRecord
    }

    fn normalize(&self, subject_id: &str, row: &RawRow) -> Option<NormalizedRecord> {
        let occurred_start = first_timestamp(row, &TIMESTAMP_PRIORITY)?;
        Some(NormalizedRecord {
            subject_id: subject_id.to_string(),
            source_kind: self.kind(),
            source_record_id: str_field(row, "visit_id").unwrap_or("unknown").to_string(),
            occurred_start: Some(occurred_start),
            occurred_end: None,
            status: str_field(row, "status").unwrap_or("completed").to_string(),
            free_text: join_narrative(row, &NARRATIVE_FIELDS),
            coded_terms: vec![],
        })
    }
}
