use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::merge::{LogicalEvent, MergedStream};
use crate::models::{Course, CourseWarning, Tag, TaggedRecord};
use crate::vocabulary::Vocabulary;

/// Output of course reconstruction for one subject. Warnings that could
/// not be attached to any course (an end milestone with no open course)
/// surface here.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    pub courses: Vec<Course>,
    pub orphan_warnings: Vec<CourseWarning>,
}

/// A course that has seen its start milestone but not yet its end.
struct OpenCourse {
    start_date: NaiveDate,
    last_activity: NaiveDate,
    member_indexes: Vec<usize>,
    warnings: Vec<CourseWarning>,
    /// Sessions observed while open but beyond the gap threshold of the
    /// course's activity. Claimed at close when they fall inside the
    /// bounded window, otherwise released for session clustering.
    stashed_sessions: Vec<(NaiveDate, Vec<usize>)>,
}

struct DraftCourse {
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    member_indexes: Vec<usize>,
    warnings: Vec<CourseWarning>,
}

impl OpenCourse {
    fn open(event: &LogicalEvent) -> Self {
        Self {
            start_date: event.date,
            last_activity: event.date,
            member_indexes: event.member_indexes.clone(),
            warnings: vec![],
            stashed_sessions: vec![],
        }
    }

    /// Close at an end milestone, claiming stashed sessions inside the
    /// now-bounded window. Sessions beyond the window are released.
    fn close(mut self, event: &LogicalEvent, leftovers: &mut Vec<(NaiveDate, Vec<usize>)>) -> DraftCourse {
        self.member_indexes.extend(event.member_indexes.iter().copied());
        for (date, indexes) in self.stashed_sessions.drain(..) {
            if date <= event.date {
                self.member_indexes.extend(indexes);
            } else {
                leftovers.push((date, indexes));
            }
        }
        DraftCourse {
            start_date: self.start_date,
            end_date: Some(event.date),
            member_indexes: self.member_indexes,
            warnings: self.warnings,
        }
    }

    /// Finalize without an end milestone: a valid, expected terminal
    /// state, not an error. Stashed sessions are released.
    fn finalize_open(mut self, leftovers: &mut Vec<(NaiveDate, Vec<usize>)>) -> DraftCourse {
        leftovers.append(&mut self.stashed_sessions);
        DraftCourse {
            start_date: self.start_date,
            end_date: None,
            member_indexes: self.member_indexes,
            warnings: self.warnings,
        }
    }
}

/// Group the merged event stream into discrete treatment courses.
///
/// Handles both documentation regimes with one pass: explicit start/end
/// milestones drive boundaries where present; remaining session events
/// are gap-clustered. Callers never select a regime. An empty stream
/// yields an empty course list.
pub fn reconstruct_courses(stream: &MergedStream, config: &EngineConfig) -> Reconstruction {
    let threshold = config.gap_threshold_days;
    let mut drafts: Vec<DraftCourse> = Vec::new();
    let mut orphan_warnings: Vec<CourseWarning> = Vec::new();
    let mut leftovers: Vec<(NaiveDate, Vec<usize>)> = Vec::new();
    let mut open: Option<OpenCourse> = None;

    for event in &stream.events {
        let has_start = event.has_tag(Tag::CourseStart);
        let has_end = event.has_tag(Tag::CourseEnd);

        if has_end {
            // The nearest end after the start closes the pending course.
            if let Some(current) = open.take() {
                drafts.push(current.close(event, &mut leftovers));
                continue;
            }
            if !has_start {
                let record_id = stream.member_ids(event).into_iter().next().unwrap_or_default();
                tracing::warn!(
                    record = %record_id,
                    date = %event.date,
                    "course end with no open course; not used for boundaries"
                );
                orphan_warnings.push(CourseWarning::EndWithoutStart {
                    record_id,
                    date: event.date,
                });
                // Not a boundary, but any session facet still counts
                // toward session clustering below.
            }
        }

        if has_start {
            match open.take() {
                None => open = Some(OpenCourse::open(event)),
                Some(mut current) => {
                    let gap = (event.date - current.last_activity).num_days();
                    if gap > threshold {
                        // Far enough from the open course's activity: the
                        // open course stays unterminated, a new one opens.
                        drafts.push(current.finalize_open(&mut leftovers));
                        open = Some(OpenCourse::open(event));
                    } else {
                        // Fold-in is a documented heuristic, not settled
                        // clinical truth; always surfaced for audit.
                        let record_id = stream
                            .member_ids(event)
                            .into_iter()
                            .next()
                            .unwrap_or_default();
                        tracing::warn!(
                            record = %record_id,
                            date = %event.date,
                            gap_days = gap,
                            "course start while course open; folded into current course"
                        );
                        current.warnings.push(CourseWarning::AmbiguousBoundary {
                            record_id,
                            date: event.date,
                        });
                        current.member_indexes.extend(event.member_indexes.iter().copied());
                        current.last_activity = event.date;
                        open = Some(current);
                    }
                }
            }
            continue;
        }

        if event.has_tag(Tag::TreatmentSession) {
            match open.as_mut() {
                Some(current) => {
                    let gap = (event.date - current.last_activity).num_days();
                    if gap <= threshold {
                        current.member_indexes.extend(event.member_indexes.iter().copied());
                        current.last_activity = event.date;
                    } else {
                        current
                            .stashed_sessions
                            .push((event.date, event.member_indexes.clone()));
                    }
                }
                None => leftovers.push((event.date, event.member_indexes.clone())),
            }
            continue;
        }

        // Non-boundary, non-session events (consultations, simulations,
        // dose notes) join an open course as members only.
        if let Some(current) = open.as_mut() {
            current.member_indexes.extend(event.member_indexes.iter().copied());
        }
    }

    if let Some(current) = open.take() {
        drafts.push(current.finalize_open(&mut leftovers));
    }

    drafts.extend(cluster_sessions(&leftovers, threshold));

    finish(drafts, stream, &config.vocabulary, orphan_warnings)
}

/// Session-clustering regime: walk the sorted session dates and cut a
/// new course whenever the gap between consecutive sessions exceeds the
/// threshold.
fn cluster_sessions(sessions: &[(NaiveDate, Vec<usize>)], threshold: i64) -> Vec<DraftCourse> {
    let mut sorted: Vec<&(NaiveDate, Vec<usize>)> = sessions.iter().collect();
    sorted.sort_by_key(|(date, _)| *date);

    let mut drafts: Vec<DraftCourse> = Vec::new();
    let mut current: Option<DraftCourse> = None;

    for (date, indexes) in sorted {
        if let Some(draft) = current.as_mut() {
            let anchor = draft.end_date.unwrap_or(draft.start_date);
            if (*date - anchor).num_days() <= threshold {
                draft.end_date = Some(*date);
                draft.member_indexes.extend(indexes.iter().copied());
                continue;
            }
        }
        if let Some(done) = current.take() {
            drafts.push(done);
        }
        current = Some(DraftCourse {
            start_date: *date,
            end_date: Some(*date),
            member_indexes: indexes.clone(),
            warnings: vec![],
        });
    }
    if let Some(done) = current.take() {
        drafts.push(done);
    }
    drafts
}

/// Order drafts, assign ids, and compute derived course attributes.
fn finish(
    mut drafts: Vec<DraftCourse>,
    stream: &MergedStream,
    vocabulary: &Vocabulary,
    orphan_warnings: Vec<CourseWarning>,
) -> Reconstruction {
    drafts.sort_by_key(|d| d.start_date);

    let mut courses: Vec<Course> = Vec::with_capacity(drafts.len());
    for (i, draft) in drafts.into_iter().enumerate() {
        let duration_days = draft.end_date.map(|end| (end - draft.start_date).num_days());
        let modality_set = modalities_for(&stream.records, &draft.member_indexes, vocabulary);
        let member_record_ids = draft
            .member_indexes
            .iter()
            .map(|&idx| stream.records[idx].record.provenance_key())
            .collect();
        courses.push(Course {
            course_id: (i + 1) as u32,
            start_date: draft.start_date,
            end_date: draft.end_date,
            duration_days,
            modality_set,
            is_retreatment: false,
            member_record_ids,
            warnings: draft.warnings,
        });
    }

    // Retreatment is computed over the final chronological order.
    for i in 1..courses.len() {
        let prev_boundary = courses[i - 1].end_date.unwrap_or(courses[i - 1].start_date);
        courses[i].is_retreatment = courses[i].start_date > prev_boundary;
    }

    Reconstruction {
        courses,
        orphan_warnings,
    }
}

/// Union of controlled-vocabulary technique labels found in the member
/// records' narrative text or coded-term displays.
fn modalities_for(
    records: &[TaggedRecord],
    member_indexes: &[usize],
    vocabulary: &Vocabulary,
) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for &idx in member_indexes {
        let record = &records[idx].record;
        for term in &vocabulary.modalities {
            let in_text = term.phrases.iter().any(|p| record.free_text.contains(p.as_str()));
            let in_codes = record.coded_terms.iter().any(|c| {
                let display = c.display.to_lowercase();
                term.phrases.iter().any(|p| display.contains(p.as_str()))
            });
            if in_text || in_codes {
                found.insert(term.label.clone());
            }
        }
    }
    found
}
