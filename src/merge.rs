use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{SourceKind, Tag, TaggedRecord};
use crate::vocabulary::Vocabulary;

/// One logical real-world event, possibly backed by several records
/// from independent sources observed on the same day.
#[derive(Debug, Clone)]
pub struct LogicalEvent {
    pub date: NaiveDate,
    /// Union of tags across member records.
    pub tags: BTreeSet<Tag>,
    /// Indexes into `MergedStream::records`, first is the
    /// highest-priority source.
    pub member_indexes: Vec<usize>,
}

impl LogicalEvent {
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }
}

/// The merged, chronologically sorted event stream for one subject.
/// Owns the canonical working record set; courses reference records by
/// provenance key, never by ownership.
#[derive(Debug, Clone, Default)]
pub struct MergedStream {
    /// Classified records admitted to the working set, sorted by
    /// occurrence, then fixed source priority, then record id.
    pub records: Vec<TaggedRecord>,
    /// Records excluded from merging (unclassified or no tag matched),
    /// retained for the audit sink.
    pub audit_records: Vec<TaggedRecord>,
    /// Deduplicated logical events over `records`. Cancelled records
    /// are retained in `records` but never back an event here.
    pub events: Vec<LogicalEvent>,
    /// Reporting-only: which source kinds contributed each tag.
    pub provenance: BTreeMap<Tag, BTreeSet<SourceKind>>,
}

impl MergedStream {
    pub fn member_ids(&self, event: &LogicalEvent) -> Vec<String> {
        event
            .member_indexes
            .iter()
            .map(|&i| self.records[i].record.provenance_key())
            .collect()
    }
}

/// Union tagged records from all sources for one subject into a single
/// chronological stream with duplicates suppressed.
///
/// Two records are the same real-world event when they share the same
/// day and at least one anchor tag (course start, course end, or
/// consultation). Duplicates stay in the member list for audit but form
/// one logical event for clustering.
pub fn merge_subject_records(tagged: Vec<TaggedRecord>, vocabulary: &Vocabulary) -> MergedStream {
    let mut working: Vec<TaggedRecord> = Vec::new();
    let mut audit_records: Vec<TaggedRecord> = Vec::new();

    for record in tagged {
        if record.tags.is_empty() || record.is_unclassified() {
            audit_records.push(record);
        } else {
            working.push(record);
        }
    }

    // Deterministic order: occurrence, fixed source priority, record id.
    working.sort_by(|a, b| {
        let key = |r: &TaggedRecord| {
            (
                r.record.instant().unwrap_or(NaiveDateTime::MAX),
                r.record.source_kind.merge_priority(),
                r.record.source_record_id.clone(),
            )
        };
        key(a).cmp(&key(b))
    });

    let mut provenance: BTreeMap<Tag, BTreeSet<SourceKind>> = BTreeMap::new();
    for record in &working {
        for tag in &record.tags {
            provenance
                .entry(*tag)
                .or_default()
                .insert(record.record.source_kind);
        }
    }

    let mut events: Vec<LogicalEvent> = Vec::new();
    for (index, record) in working.iter().enumerate() {
        if vocabulary.indicates_cancellation(&record.record.status) {
            tracing::debug!(
                record = %record.record.provenance_key(),
                status = %record.record.status,
                "cancelled record retained for audit, excluded from events"
            );
            continue;
        }
        let Some(date) = record.record.date() else {
            continue;
        };

        let anchors: BTreeSet<Tag> = record
            .tags
            .iter()
            .copied()
            .filter(Tag::is_dedup_anchor)
            .collect();

        // Same-date events are contiguous at the tail of the sorted stream.
        let duplicate_of = if anchors.is_empty() {
            None
        } else {
            events
                .iter()
                .enumerate()
                .rev()
                .take_while(|(_, e)| e.date == date)
                .find(|(_, e)| e.tags.iter().any(|t| anchors.contains(t)))
                .map(|(i, _)| i)
        };

        match duplicate_of {
            Some(i) => {
                events[i].tags.extend(record.tags.iter().copied());
                events[i].member_indexes.push(index);
            }
            None => events.push(LogicalEvent {
                date,
                tags: record.tags.clone(),
                member_indexes: vec![index],
            }),
        }
    }

    MergedStream {
        records: working,
        audit_records,
        events,
        provenance,
    }
}
