use crate::models::{NormalizedRecord, RawRow, SourceKind};

use super::{coded_term, first_timestamp, join_narrative, str_field, SourceAdapter};

/// Billed / charted procedure-code rows. Timestamp priority: performed
/// datetime, then performed-period start.
pub struct ProcedureCodeAdapter;

const TIMESTAMP_PRIORITY: [&str; 2] = ["performed_datetime", "performed_period_start"];
const NARRATIVE_FIELDS: [&str; 1] = ["description"];

impl SourceAdapter for ProcedureCodeAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::ProcedureCode
    }

    fn normalize(&self, subject_id: &str, row: &RawRow) -> Option<NormalizedRecord> {
        let occurred_start = first_timestamp(row, &TIMESTAMP_PRIORITY)?;
        let mut coded_terms = vec![];
        if let Some(term) = coded_term(row, "code_system", "code", "code_display") {
            coded_terms.push(term);
        }
        Some(NormalizedRecord {
            subject_id: subject_id.to_string(),
            source_kind: self.kind(),
            source_record_id: str_field(row, "procedure_id").unwrap_or("unknown").to_string(),
            occurred_start: Some(occurred_start),
            occurred_end: first_timestamp(row, &["performed_period_end"]),
            status: str_field(row, "status").unwrap_or("completed").to_string(),
            free_text: join_narrative(row, &NARRATIVE_FIELDS),
            coded_terms,
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
    fn captures_coded_term_triple() {
        let row = row_from_json(json!({
            "procedure_id": "pc-1",
            "performed_datetime": "2023-02-10T13:00:00",
            "code_system": "cpt",
            "code": "77385",
            "code_display": "IMRT treatment delivery",
        }));
        let record = ProcedureCodeAdapter.normalize("subj-1", &row).unwrap();
        assert_eq!(record.coded_terms.len(), 1);
        assert_eq!(record.coded_terms[0].system, "cpt");
        assert_eq!(record.coded_terms[0].code, "77385");
        assert_eq!(record.date(), NaiveDate::from_ymd_opt(2023, 2, 10));
    }

    #[test]
    fn code_without_system_still_captured() {
        let row = row_from_json(json!({
            "procedure_id": "pc-2",
            "performed_period_start": "2023-02-11",
            "code": "77427",
        }));
        let record = ProcedureCodeAdapter.normalize("subj-1", &row).unwrap();
        assert_eq!(record.coded_terms[0].code, "77427");
        assert!(record.coded_terms[0].system.is_empty());
    }

    #[test]
    fn dropped_without_performed_time() {
        let row = row_from_json(json!({ "procedure_id": "pc-3", "code": "77427" }));
        assert!(ProcedureCodeAdapter.normalize("subj-1", &row).is_none());
    }
}
