use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::errors::EngineError;
use crate::models::{Course, SubjectSummary, Tag, TaggedRecord};

/// Whole days between birth and an event. Negative ages are rejected;
/// the failure is fatal for this one computation only.
pub fn age_at_event_days(birth_date: NaiveDate, event_date: NaiveDate) -> Result<i64, EngineError> {
    if event_date < birth_date {
        return Err(EngineError::InvalidDate {
            birth_date,
            event_date,
        });
    }
    Ok((event_date - birth_date).num_days())
}

/// Compute the per-subject rollup. Pure function of its inputs.
///
/// Consultations are counted as distinct dates bearing the tag,
/// mirroring the merger's deduplication policy; sessions are counted
/// per record.
pub fn summarize(
    birth_date: Option<NaiveDate>,
    courses: &[Course],
    tagged: &[TaggedRecord],
) -> SubjectSummary {
    let consultation_dates: BTreeSet<NaiveDate> = tagged
        .iter()
        .filter(|r| r.has_tag(Tag::Consultation))
        .filter_map(|r| r.record.date())
        .collect();

    let session_count = tagged
        .iter()
        .filter(|r| r.has_tag(Tag::TreatmentSession))
        .count() as u32;

    let modalities: BTreeSet<String> = courses
        .iter()
        .flat_map(|c| c.modality_set.iter().cloned())
        .collect();

    let age_at_first_course_days = match (birth_date, courses.first()) {
        (Some(birth), Some(first)) => match age_at_event_days(birth, first.start_date) {
            Ok(days) => Some(days),
            Err(err) => {
                tracing::warn!(%err, "age computation failed; summary field left empty");
                None
            }
        },
        _ => None,
    };

    SubjectSummary {
        consultation_count: consultation_dates.len() as u32,
        session_count,
        course_count: courses.len() as u32,
        modalities,
        any_retreatment: courses.iter().any(|c| c.is_retreatment),
        age_at_first_course_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NormalizedRecord, SourceKind};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tagged_on(date: NaiveDate, id: &str, tags: &[Tag]) -> TaggedRecord {
        TaggedRecord {
            record: NormalizedRecord {
                subject_id: "subj-1".into(),
                source_kind: SourceKind::VisitRecord,
                source_record_id: id.into(),
                occurred_start: Some(date.and_hms_opt(9, 0, 0).unwrap()),
                occurred_end: None,
                status: "completed".into(),
                free_text: "x".into(),
                coded_terms: vec![],
            },
            tags: tags.iter().copied().collect(),
            tag_evidence: vec![],
            dose: None,
        }
    }

    fn course(id: u32, start: NaiveDate, end: Option<NaiveDate>, retreat: bool) -> Course {
        Course {
            course_id: id,
            start_date: start,
            end_date: end,
            duration_days: end.map(|e| (e - start).num_days()),
            modality_set: BTreeSet::new(),
            is_retreatment: retreat,
            member_record_ids: vec![],
            warnings: vec![],
        }
    }

    #[test]
    fn age_in_whole_days() {
        assert_eq!(
            age_at_event_days(day(1950, 1, 1), day(1950, 2, 1)).unwrap(),
            31
        );
    }

    #[test]
    fn negative_age_is_invalid_date() {
        let err = age_at_event_days(day(1990, 1, 1), day(1989, 12, 31)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDate { .. }));
    }

    #[test]
    fn consultations_counted_by_distinct_date() {
        let d = day(2023, 2, 10);
        let tagged = vec![
            tagged_on(d, "v-1", &[Tag::Consultation]),
            tagged_on(d, "n-1", &[Tag::Consultation]),
            tagged_on(day(2023, 2, 17), "v-2", &[Tag::Consultation]),
        ];
        let summary = summarize(None, &[], &tagged);
        assert_eq!(summary.consultation_count, 2);
    }

    #[test]
    fn sessions_counted_per_record() {
        let tagged = vec![
            tagged_on(day(2023, 3, 1), "v-1", &[Tag::TreatmentSession]),
            tagged_on(day(2023, 3, 2), "v-2", &[Tag::TreatmentSession]),
        ];
        let summary = summarize(None, &[], &tagged);
        assert_eq!(summary.session_count, 2);
    }

    #[test]
    fn rollups_across_courses() {
        let mut c1 = course(1, day(2023, 1, 1), Some(day(2023, 2, 1)), false);
        c1.modality_set.insert("imrt".into());
        let mut c2 = course(2, day(2023, 6, 1), None, true);
        c2.modality_set.insert("vmat".into());
        let summary = summarize(Some(day(1960, 1, 1)), &[c1, c2], &[]);
        assert_eq!(summary.course_count, 2);
        assert!(summary.any_retreatment);
        assert!(summary.modalities.contains("imrt"));
        assert!(summary.modalities.contains("vmat"));
        assert_eq!(summary.age_at_first_course_days, Some(23011));
    }

    #[test]
    fn bad_birth_date_leaves_age_empty_without_failing() {
        let c1 = course(1, day(2023, 1, 1), None, false);
        let summary = summarize(Some(day(2024, 1, 1)), &[c1], &[]);
        assert_eq!(summary.age_at_first_course_days, None);
        assert_eq!(summary.course_count, 1);
    }

    #[test]
    fn pure_function_same_inputs_same_outputs() {
        let tagged = vec![tagged_on(day(2023, 3, 1), "v-1", &[Tag::TreatmentSession])];
        let courses = vec![course(1, day(2023, 3, 1), Some(day(2023, 3, 5)), false)];
        let a = summarize(Some(day(1970, 5, 4)), &courses, &tagged);
        let b = summarize(Some(day(1970, 5, 4)), &courses, &tagged);
        assert_eq!(a, b);
    }
}
