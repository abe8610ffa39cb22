use crate::models::{NormalizedRecord, RawRow, SourceKind};

use super::{first_timestamp, join_narrative, str_field, SourceAdapter};

/// Order rows. Timestamp priority: explicit occurrence timestamp, then
/// occurrence-period start, then authoring timestamp.
pub struct OrderRecordAdapter;

const ORDER_TIMESTAMP_PRIORITY: [&str; 3] =
    ["occurrence_datetime", "occurrence_period_start", "authored_on"];
const ORDER_NARRATIVE_FIELDS: [&str; 3] = ["order_text", "instructions", "note"];

impl SourceAdapter for OrderRecordAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::OrderRecord
    }

    fn normalize(&self, subject_id: &str, row: &RawRow) -> Option<NormalizedRecord> {
        let occurred_start = first_timestamp(row, &ORDER_TIMESTAMP_PRIORITY)?;
        Some(NormalizedRecord {
            subject_id: subject_id.to_string(),
            source_kind: self.kind(),
            source_record_id: str_field(row, "order_id").unwrap_or("unknown").to_string(),
            occurred_start: Some(occurred_start),
            occurred_end: first_timestamp(row, &["occurrence_period_end"]),
            status: str_field(row, "order_status").unwrap_or("unknown").to_string(),
            free_text: join_narrative(row, &ORDER_NARRATIVE_FIELDS),
            coded_terms: vec![],
        })
    }
}

/// Free-text notes attached to an order.
pub struct OrderNoteAdapter;

const NOTE_TIMESTAMP_PRIORITY: [&str; 2] = ["note_datetime", "recorded_at"];
const NOTE_NARRATIVE_FIELDS: [&str; 2] = ["note_title", "note_text"];

impl SourceAdapter for OrderNoteAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::OrderNote
    }

    fn normalize(&self, subject_id: &str, row: &RawRow) -> Option<NormalizedRecord> {
        let occurred_start = first_timestamp(row, &NOTE_TIMESTAMP_PRIORITY)?;
        Some(NormalizedRecord {
            subject_id: subject_id.to_string(),
            source_kind: self.kind(),
            source_record_id: str_field(row, "note_id").unwrap_or("unknown").to_string(),
            occurred_start: Some(occurred_start),
            occurred_end: None,
            status: str_field(row, "note_status").unwrap_or("final").to_string(),
            free_text: join_narrative(row, &NOTE_NARRATIVE_FIELDS),
            coded_terms: vec![],
        })
    }
}
