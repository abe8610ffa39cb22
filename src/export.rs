use crate::models::{Course, EvidenceField, SubjectSummary, TaggedRecord};

/// A plain tabular structure: ordered column list plus ordered rows,
/// suitable for any flat-file or tabular sink. The engine itself
/// performs no file or network I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

const RECORD_COLUMNS: [&str; 9] = [
    "subject_id",
    "source_kind",
    "source_record_id",
    "occurred_start",
    "occurred_end",
    "status",
    "tags",
    "tag_evidence",
    "dose",
];

const COURSE_COLUMNS: [&str; 9] = [
    "subject_id",
    "course_id",
    "start_date",
    "end_date",
    "duration_days",
    "modalities",
    "is_retreatment",
    "member_record_ids",
    "warning_count",
];

const SUMMARY_COLUMNS: [&str; 7] = [
    "subject_id",
    "consultation_count",
    "session_count",
    "course_count",
    "modalities",
    "any_retreatment",
    "age_at_first_course_days",
];

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(T::to_string).unwrap_or_default()
}

/// Full tagged-record list, for audit and debugging.
pub fn records_table(subject_id: &str, records: &[TaggedRecord]) -> Table {
    let rows = records
        .iter()
        .map(|tagged| {
            let tags = tagged
                .tags
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join("|");
            let evidence = tagged
                .tag_evidence
                .iter()
                .map(|e| {
                    let field = match e.field {
                        EvidenceField::FreeText => "free_text",
                        EvidenceField::CodedTermDisplay => "coded_term",
                    };
                    format!("{}={}@{}", e.tag.as_str(), e.phrase, field)
                })
                .collect::<Vec<_>>()
                .join("|");
            let dose = tagged
                .dose
                .as_ref()
                .map(|d| format!("{} {}", d.value, d.unit))
                .unwrap_or_default();
            vec![
                subject_id.to_string(),
                tagged.record.source_kind.to_string(),
                tagged.record.source_record_id.clone(),
                opt(&tagged.record.occurred_start),
                opt(&tagged.record.occurred_end),
                tagged.record.status.clone(),
                tags,
                evidence,
                dose,
            ]
        })
        .collect();
    Table {
        name: "tagged_records".into(),
        columns: RECORD_COLUMNS.to_vec(),
        rows,
    }
}

/// Reconstructed course list.
pub fn courses_table(subject_id: &str, courses: &[Course]) -> Table {
    let rows = courses
        .iter()
        .map(|course| {
            vec![
                subject_id.to_string(),
                course.course_id.to_string(),
                course.start_date.to_string(),
                opt(&course.end_date),
                opt(&course.duration_days),
                course.modality_set.iter().cloned().collect::<Vec<_>>().join("|"),
                course.is_retreatment.to_string(),
                course.member_record_ids.join("|"),
                course.warnings.len().to_string(),
            ]
        })
        .collect();
    Table {
        name: "courses".into(),
        columns: COURSE_COLUMNS.to_vec(),
        rows,
    }
}

/// Single-row derived-attribute summary.
pub fn summary_table(subject_id: &str, summary: &SubjectSummary) -> Table {
    Table {
        name: "subject_summary".into(),
        columns: SUMMARY_COLUMNS.to_vec(),
        rows: vec![vec![
            subject_id.to_string(),
            summary.consultation_count.to_string(),
            summary.session_count.to_string(),
            summary.course_count.to_string(),
            summary.modalities.iter().cloned().collect::<Vec<_>>().join("|"),
            summary.any_retreatment.to_string(),
            opt(&summary.age_at_first_course_days),
        ]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseWarning, NormalizedRecord, SourceKind, Tag};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    #[test]
    fn records_table_shape_matches_columns() {
        let tagged = TaggedRecord {
            record: NormalizedRecord {
                subject_id: "subj-1".into(),
                source_kind: SourceKind::OrderRecord,
                source_record_id: "o-1".into(),
                occurred_start: NaiveDate::from_ymd_opt(2023, 5, 2)
                    .map(|d| d.and_hms_opt(10, 0, 0).unwrap()),
                occurred_end: None,
                status: "fulfilled".into(),
                free_text: "total dose 54 gy".into(),
                coded_terms: vec![],
            },
            tags: BTreeSet::from([Tag::DoseInformation]),
            tag_evidence: vec![],
            dose: Some(crate::models::DoseValue {
                value: 54.0,
                unit: "gy".into(),
            }),
        };
        let table = records_table("subj-1", &[tagged]);
        assert_eq!(table.columns.len(), 9);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].len(), table.columns.len());
        assert_eq!(table.rows[0][1], "order_record");
        assert_eq!(table.rows[0][6], "dose_information");
        assert_eq!(table.rows[0][8], "54 gy");
    }

    #[test]
    fn courses_table_serializes_open_course_with_empty_end() {
        let course = Course {
            course_id: 1,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end_date: None,
            duration_days: None,
            modality_set: BTreeSet::from(["imrt".to_string()]),
            is_retreatment: false,
            member_record_ids: vec!["visit_record:v-1".into()],
            warnings: vec![CourseWarning::AmbiguousBoundary {
                record_id: "visit_record:v-2".into(),
                date: NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
            }],
        };
        let table = courses_table("subj-1", &[course]);
        let row = &table.rows[0];
        assert_eq!(row[3], "");
        assert_eq!(row[4], "");
        assert_eq!(row[5], "imrt");
        assert_eq!(row[8], "1");
    }

    #[test]
    fn summary_table_is_single_row() {
        let summary = SubjectSummary {
            consultation_count: 1,
            session_count: 8,
            course_count: 2,
            modalities: BTreeSet::from(["vmat".to_string()]),
            any_retreatment: true,
            age_at_first_course_days: Some(20000),
        };
        let table = summary_table("subj-1", &summary);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][5], "true");
        assert_eq!(table.rows[0][6], "20000");
    }
}
