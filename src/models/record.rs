use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::{SourceKind, Tag};

/// A raw row as returned by a source collaborator: a flat mapping of
/// field name to value. No ordering or schema guarantee.
pub type RawRow = HashMap<String, serde_json::Value>;

/// A structured code attached to a source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedTerm {
    pub system: String,
    pub code: String,
    pub display: String,
}

/// One observed fact from one source, in canonical shape.
/// Immutable once created: classification produces a `TaggedRecord`,
/// never a mutation of this value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub subject_id: String,
    pub source_kind: SourceKind,
    /// Provenance key, unique within `source_kind`.
    pub source_record_id: String,
    pub occurred_start: Option<NaiveDateTime>,
    pub occurred_end: Option<NaiveDateTime>,
    /// Free-form source status ("fulfilled", "cancelled", "completed", ...).
    pub status: String,
    /// All narrative fields concatenated, lower-cased, single-space joined.
    pub free_text: String,
    pub coded_terms: Vec<CodedTerm>,
}

impl NormalizedRecord {
    /// The best-available instant for ordering: start, falling back to end.
    pub fn instant(&self) -> Option<NaiveDateTime> {
        self.occurred_start.or(self.occurred_end)
    }

    /// Day-granularity date of the record, for dedup and course logic.
    pub fn date(&self) -> Option<NaiveDate> {
        self.instant().map(|t| t.date())
    }

    /// Globally unique provenance key across source kinds.
    pub fn provenance_key(&self) -> String {
        format!("{}:{}", self.source_kind.as_str(), self.source_record_id)
    }
}

/// Where a tag's matching phrase was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceField {
    FreeText,
    CodedTermDisplay,
}

/// One matched phrase supporting one tag. Required for auditability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEvidence {
    pub tag: Tag,
    pub phrase: String,
    pub field: EvidenceField,
}

/// Best-effort dose extracted from narrative text. Side-channel only;
/// absence never blocks course reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseValue {
    pub value: f64,
    pub unit: String,
}

/// A `NormalizedRecord` plus classifier output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedRecord {
    pub record: NormalizedRecord,
    pub tags: std::collections::BTreeSet<Tag>,
    pub tag_evidence: Vec<TagEvidence>,
    pub dose: Option<DoseValue>,
}

impl TaggedRecord {
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// True when the classifier found nothing; such records go to the
    /// audit sink and never enter the merged stream.
    pub fn is_unclassified(&self) -> bool {
        self.tags.len() == 1 && self.tags.contains(&Tag::Unclassified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(start: Option<&str>, end: Option<&str>) -> NormalizedRecord {
        let parse = |s: &str| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
        };
        NormalizedRecord {
            subject_id: "subj-1".into(),
            source_kind: SourceKind::VisitRecord,
            source_record_id: "v-1".into(),
            occurred_start: start.map(parse),
            occurred_end: end.map(parse),
            status: "completed".into(),
            free_text: String::new(),
            coded_terms: vec![],
        }
    }

    #[test]
    fn instant_prefers_start() {
        let r = record(Some("2023-04-01 09:00:00"), Some("2023-05-10 09:00:00"));
        assert_eq!(r.date(), NaiveDate::from_ymd_opt(2023, 4, 1));
    }

    #[test]
    fn instant_falls_back_to_end() {
        let r = record(None, Some("2023-05-10 09:00:00"));
        assert_eq!(r.date(), NaiveDate::from_ymd_opt(2023, 5, 10));
    }

    #[test]
    fn provenance_key_includes_source_kind() {
        let r = record(Some("2023-04-01 09:00:00"), None);
        assert_eq!(r.provenance_key(), "visit_record:v-1");
    }
}
