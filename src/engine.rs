use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::classify::Classifier;
use crate::config::EngineConfig;
use crate::courses::reconstruct_courses;
use crate::errors::EngineError;
use crate::merge::merge_subject_records;
use crate::models::{
    Course, CourseWarning, RawRow, SourceFailure, SourceKind, SubjectOutcome, SubjectSummary, Tag,
    TaggedRecord,
};
use crate::sources::adapter_for;
use crate::summary::summarize;

/// The query/storage boundary. Returns zero or more flat rows for a
/// subject/source pair, in no particular order; the engine sorts
/// internally. Fetching is the only operation that may block.
pub trait SourceCollaborator: Send + Sync {
    fn fetch_rows(&self, subject_id: &str, kind: SourceKind) -> Result<Vec<RawRow>, EngineError>;
}

/// One subject to process.
#[derive(Debug, Clone)]
pub struct SubjectRequest {
    pub subject_id: String,
    pub birth_date: Option<NaiveDate>,
}

/// Everything one run produces for one subject. Never silently absent:
/// the outcome states full, partial, or empty-with-reason.
#[derive(Debug, Clone)]
pub struct SubjectResult {
    pub subject_id: String,
    pub outcome: SubjectOutcome,
    /// Full tagged-record list, audit sink included.
    pub tagged_records: Vec<TaggedRecord>,
    pub courses: Vec<Course>,
    /// Reconstruction warnings not attached to any course.
    pub orphan_warnings: Vec<CourseWarning>,
    pub summary: SubjectSummary,
    /// Reporting-only: which source kinds contributed each tag.
    pub provenance: BTreeMap<Tag, BTreeSet<SourceKind>>,
    pub source_failures: Vec<SourceFailure>,
    /// Rows dropped at normalization for lack of any timestamp.
    pub skipped_row_count: u32,
}

/// Run the full pipeline for one subject: fetch, normalize, classify,
/// merge, reconstruct, summarize. Single-threaded and pure once the
/// fetches complete; failures of individual sources degrade the outcome
/// instead of aborting it.
pub fn run_subject<C: SourceCollaborator + ?Sized>(
    collaborator: &C,
    request: &SubjectRequest,
    config: &EngineConfig,
) -> SubjectResult {
    let subject_id = request.subject_id.trim();
    if subject_id.is_empty() {
        tracing::warn!("empty subject identifier submitted; nothing to do");
        return empty_result(request, "subject identifier is empty");
    }

    let classifier = Classifier::new(&config.vocabulary);
    let mut tagged: Vec<TaggedRecord> = Vec::new();
    let mut source_failures: Vec<SourceFailure> = Vec::new();
    let mut skipped_row_count: u32 = 0;

    for kind in SourceKind::ALL {
        let rows = match collaborator.fetch_rows(subject_id, kind) {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(subject = subject_id, source = %kind, %err, "source unavailable, continuing with remaining sources");
                source_failures.push(SourceFailure {
                    kind,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        let adapter = adapter_for(kind);
        for row in &rows {
            match adapter.normalize(subject_id, row) {
                Some(record) => tagged.push(classifier.classify(record)),
                None => {
                    skipped_row_count += 1;
                    tracing::debug!(
                        subject = subject_id,
                        source = %kind,
                        "row dropped at normalization: no timestamp could be resolved"
                    );
                }
            }
        }
    }

    if tagged.is_empty() {
        let reason = if source_failures.len() == SourceKind::ALL.len() {
            "all sources unavailable".to_string()
        } else {
            "no records with temporal information in any source".to_string()
        };
        let mut result = empty_result(request, &reason);
        result.source_failures = source_failures;
        result.skipped_row_count = skipped_row_count;
        return result;
    }

    let merged = merge_subject_records(tagged, &config.vocabulary);
    let reconstruction = reconstruct_courses(&merged, config);
    let provenance = merged.provenance.clone();

    // Reassemble the full record list for the audit artifact; the
    // working set comes first, excluded records after.
    let mut tagged_records = merged.records;
    tagged_records.extend(merged.audit_records);

    let summary = summarize(request.birth_date, &reconstruction.courses, &tagged_records);

    let mut problems: Vec<String> = source_failures
        .iter()
        .map(|f| format!("source {} unavailable: {}", f.kind, f.reason))
        .collect();
    for course in &reconstruction.courses {
        for warning in &course.warnings {
            problems.push(format!("course {}: {:?}", course.course_id, warning));
        }
    }
    for warning in &reconstruction.orphan_warnings {
        problems.push(format!("unattached: {warning:?}"));
    }

    let outcome = if problems.is_empty() {
        SubjectOutcome::Full
    } else {
        SubjectOutcome::Partial { problems }
    };

    SubjectResult {
        subject_id: subject_id.to_string(),
        outcome,
        tagged_records,
        courses: reconstruction.courses,
        orphan_warnings: reconstruction.orphan_warnings,
        summary,
        provenance,
        source_failures,
        skipped_row_count,
    }
}

fn empty_result(request: &SubjectRequest, reason: &str) -> SubjectResult {
    SubjectResult {
        subject_id: request.subject_id.clone(),
        outcome: SubjectOutcome::Empty {
            reason: reason.to_string(),
        },
        tagged_records: vec![],
        courses: vec![],
        orphan_warnings: vec![],
        summary: summarize(request.birth_date, &[], &[]),
        provenance: BTreeMap::new(),
        source_failures: vec![],
        skipped_row_count: 0,
    }
}

/// Process many subjects on a worker pool, one task per subject, no
/// cross-task state. Results come back in request order. A panicking
/// subject task degrades to an empty outcome for that subject only.
pub async fn run_subjects<C>(
    collaborator: Arc<C>,
    requests: Vec<SubjectRequest>,
    config: Arc<EngineConfig>,
) -> Vec<SubjectResult>
where
    C: SourceCollaborator + 'static,
{
    let run_id = Uuid::new_v4();
    tracing::info!(%run_id, subjects = requests.len(), vocabulary = %config.vocabulary.version, "run started");

    let mut handles = Vec::with_capacity(requests.len());
    for request in requests {
        let collaborator = Arc::clone(&collaborator);
        let config = Arc::clone(&config);
        handles.push((
            request.clone(),
            tokio::task::spawn_blocking(move || run_subject(&*collaborator, &request, &config)),
        ));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (request, handle) in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(err) => {
                tracing::error!(subject = %request.subject_id, %err, "subject task failed; reporting empty outcome");
                results.push(empty_result(&request, "subject task failed"));
            }
        }
    }

    tracing::info!(%run_id, "run finished");
    results
}
