pub mod order;
pub mod plan;
pub mod procedure_code;
pub mod visit;

pub use order::{OrderNoteAdapter, OrderRecordAdapter};
pub use plan::{PlanNoteAdapter, PlanRecordAdapter};
pub use procedure_code::ProcedureCodeAdapter;
pub use visit::VisitRecordAdapter;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{CodedTerm, NormalizedRecord, RawRow, SourceKind};

/// One implementation per source kind. The engine depends only on this
/// trait, never on source-specific field names.
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Convert one raw row into canonical shape. Returns `None` when no
    /// timestamp can be resolved; the caller logs the skip.
    fn normalize(&self, subject_id: &str, row: &RawRow) -> Option<NormalizedRecord>;
}

/// Registry: the adapter responsible for a given source kind.
pub fn adapter_for(kind: SourceKind) -> Box<dyn SourceAdapter> {
    match kind {
        SourceKind::VisitRecord => Box::new(VisitRecordAdapter),
        SourceKind::PlanRecord => Box::new(PlanRecordAdapter),
        SourceKind::OrderRecord => Box::new(OrderRecordAdapter),
        SourceKind::PlanNote => Box::new(PlanNoteAdapter),
        SourceKind::OrderNote => Box::new(OrderNoteAdapter),
        SourceKind::ProcedureCode => Box::new(ProcedureCodeAdapter),
    }
}

// ---------------------------------------------------------------------------
// Shared field extraction helpers
// ---------------------------------------------------------------------------

/// Non-empty trimmed string value of a field, if present.
pub(crate) fn str_field<'a>(row: &'a RawRow, name: &str) -> Option<&'a str> {
    let value = row.get(name)?.as_str()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Parse a source timestamp. Accepts ISO 8601 datetimes (`T` or space
/// separated, optional fractional seconds, optional trailing `Z`) and
/// bare dates, which resolve to midnight.
pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim().trim_end_matches('Z');
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    None
}

/// First parseable timestamp among `fields`, tried in priority order.
/// Each adapter documents its own priority list.
pub(crate) fn first_timestamp(row: &RawRow, fields: &[&str]) -> Option<NaiveDateTime> {
    fields
        .iter()
        .find_map(|name| str_field(row, name).and_then(parse_timestamp))
}

/// Concatenate the narrative-bearing fields into one lower-cased string,
/// field boundaries collapsed to a single space.
///
/// Known limitation: a phrase match may span two adjacent fields across
/// the joining space. The join is deliberate and stable; dictionaries
/// are curated with it in mind.
pub(crate) fn join_narrative(row: &RawRow, fields: &[&str]) -> String {
    let parts: Vec<String> = fields
        .iter()
        .filter_map(|name| str_field(row, name))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
        .collect();
    parts.join(" ").to_lowercase()
}

/// Build a coded term from a (system, code, display) field triple.
/// Requires at least the code itself.
pub(crate) fn coded_term(
    row: &RawRow,
    system_field: &str,
    code_field: &str,
    display_field: &str,
) -> Option<CodedTerm> {
    let code = str_field(row, code_field)?;
    Some(CodedTerm {
        system: str_field(row, system_field).unwrap_or_default().to_string(),
        code: code.to_string(),
        display: str_field(row, display_field).unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
pub(crate) fn row_from_json(value: serde_json::Value) -> RawRow {
    serde_json::from_value(value).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_iso_datetime() {
        assert_eq!(
            parse_timestamp("2023-04-01T09:30:00"),
            NaiveDate::from_ymd_opt(2023, 4, 1).map(|d| d.and_hms_opt(9, 30, 0).unwrap())
        );
    }

    #[test]
    fn parse_space_separated_datetime() {
        assert!(parse_timestamp("2023-04-01 09:30:00").is_some());
    }

    #[test]
    fn parse_fractional_seconds_and_zulu() {
        assert!(parse_timestamp("2023-04-01T09:30:00.123Z").is_some());
    }

    #[test]
    fn parse_bare_date_is_midnight() {
        let dt = parse_timestamp("2023-04-01").unwrap();
        assert_eq!(dt.time(), NaiveTime::MIN);
    }

    #[test]
    fn parse_garbage_is_none() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn first_timestamp_respects_priority() {
        let row = row_from_json(json!({
            "authored_on": "2023-01-01",
            "occurrence_datetime": "2023-02-02T08:00:00",
        }));
        let ts = first_timestamp(&row, &["occurrence_datetime", "authored_on"]).unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2023, 2, 2).unwrap());
    }

    #[test]
    fn first_timestamp_skips_unparseable() {
        let row = row_from_json(json!({
            "occurrence_datetime": "unknown",
            "authored_on": "2023-01-01",
        }));
        let ts = first_timestamp(&row, &["occurrence_datetime", "authored_on"]).unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
    }

    #[test]
    fn join_narrative_lowercases_and_single_spaces() {
        let row = row_from_json(json!({
            "a": "First  Fraction",
            "b": "  Delivered\tToday ",
            "c": null,
        }));
        assert_eq!(join_narrative(&row, &["a", "b", "c"]), "first fraction delivered today");
    }

    #[test]
    fn join_narrative_empty_when_no_fields() {
        let row = row_from_json(json!({ "unrelated": 3 }));
        assert_eq!(join_narrative(&row, &["a", "b"]), "");
    }

    #[test]
    fn coded_term_requires_code() {
        let row = row_from_json(json!({
            "code_system": "local",
            "code_display": "IMRT plan",
        }));
        assert!(coded_term(&row, "code_system", "code", "code_display").is_none());
    }

    #[test]
    fn registry_covers_every_source_kind() {
        for kind in SourceKind::ALL {
            assert_eq!(adapter_for(kind).kind(), kind);
        }
    }
}
