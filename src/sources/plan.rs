use crate::models::{NormalizedRecord, RawRow, SourceKind};

use super::{coded_term, first_timestamp, join_narrative, str_field, SourceAdapter};

/// Treatment-plan rows. Timestamp priority: planned treatment start,
/// then plan approval time, then plan creation time. A planned end date
/// becomes `occurred_end` when present.
pub struct PlanRecordAdapter;

const PLAN_TIMESTAMP_PRIORITY: [&str; 3] =
    ["treatment_start", "approval_datetime", "created_datetime"];
const PLAN_NARRATIVE_FIELDS: [&str; 3] = ["plan_name", "plan_intent", "comments"];

impl SourceAdapter for PlanRecordAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::PlanRecord
    }

    fn normalize(&self, subject_id: &str, row: &RawRow) -> Option<NormalizedRecord> {
        let occurred_start = first_timestamp(row, &PLAN_TIMESTAMP_PRIORITY);
        let occurred_end = first_timestamp(row, &["treatment_end"]);
        if occurred_start.is_none() && occurred_end.is_none() {
            return None;
        }
        let mut coded_terms = vec![];
        if let Some(term) = coded_term(row, "technique_system", "technique_code", "technique_display")
        {
            coded_terms.push(term);
        }
        Some(NormalizedRecord {
            subject_id: subject_id.to_string(),
            source_kind: self.kind(),
            source_record_id: str_field(row, "plan_id").unwrap_or("unknown").to_string(),
            occurred_start,
            occurred_end,
            status: str_field(row, "plan_status").unwrap_or("unknown").to_string(),
            free_text: join_narrative(row, &PLAN_NARRATIVE_FIELDS),
            coded_terms,
        })
    }
}

/// Free-text notes attached to a plan. Timestamp priority: note
/// datetime, then the time it was recorded into the chart.
pub struct PlanNoteAdapter;

const NOTE_TIMESTAMP_PRIORITY: [&str; 2] = ["note_datetime", "recorded_at"];
const NOTE_NARRATIVE_FIELDS: [&str; 2] = ["note_title", "note_text"];

impl SourceAdapter for PlanNoteAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::PlanNote
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::row_from_json;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn plan_with_start_and_end_period() {
        let row = row_from_json(json!({
            "plan_id": "p-7",
            "treatment_start": "2023-02-01T07:00:00",
            "treatment_end": "2023-03-14T07:00:00",
            "plan_name": "IMRT boost",
            "plan_status": "completed",
            "technique_code": "IMRT",
            "technique_display": "Intensity modulated",
        }));
        let record = PlanRecordAdapter.normalize("subj-1", &row).unwrap();
        assert_eq!(record.date(), NaiveDate::from_ymd_opt(2023, 2, 1));
        assert_eq!(
            record.occurred_end.map(|t| t.date()),
            NaiveDate::from_ymd_opt(2023, 3, 14)
        );
        assert_eq!(record.coded_terms.len(), 1);
        assert_eq!(record.coded_terms[0].display, "Intensity modulated");
    }

    #[test]
    fn plan_with_only_end_survives() {
        let row = row_from_json(json!({
            "plan_id": "p-8",
            "treatment_end": "2023-03-14",
        }));
        let record = PlanRecordAdapter.normalize("subj-1", &row).unwrap();
        assert!(record.occurred_start.is_none());
        assert_eq!(record.date(), NaiveDate::from_ymd_opt(2023, 3, 14));
    }

    #[test]
    fn plan_without_temporal_information_dropped() {
        let row = row_from_json(json!({ "plan_id": "p-9", "plan_name": "draft" }));
        assert!(PlanRecordAdapter.normalize("subj-1", &row).is_none());
    }

    #[test]
    fn plan_note_concatenates_title_and_body() {
        let row = row_from_json(json!({
            "note_id": "n-1",
            "note_datetime": "2023-02-01T12:00:00",
            "note_title": "Treatment Started",
            "note_text": "First fraction delivered without incident.",
        }));
        let record = PlanNoteAdapter.normalize("subj-1", &row).unwrap();
        assert_eq!(
            record.free_text,
            "treatment started first fraction delivered without incident."
        );
        assert_eq!(record.status, "final");
    }
}
