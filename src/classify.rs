use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{
    DoseValue, EvidenceField, NormalizedRecord, Tag, TagEvidence, TaggedRecord,
};
use crate::vocabulary::Vocabulary;

/// Decimal-number-plus-word candidates; the word is only accepted as a
/// dose unit when it appears in the vocabulary's `dose_units` list.
static RE_DOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*([a-z]+)\b").unwrap());

/// Assigns semantic tags to normalized records using the injected,
/// versioned keyword dictionaries.
pub struct Classifier<'a> {
    vocabulary: &'a Vocabulary,
}

impl<'a> Classifier<'a> {
    pub fn new(vocabulary: &'a Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Classify one record. Never fails: a record with no matching
    /// phrases gets an empty tag set; a record with no text at all gets
    /// `Unclassified` and is later confined to the audit sink.
    pub fn classify(&self, record: NormalizedRecord) -> TaggedRecord {
        if record.free_text.is_empty() && record.coded_terms.is_empty() {
            return TaggedRecord {
                record,
                tags: BTreeSet::from([Tag::Unclassified]),
                tag_evidence: vec![],
                dose: None,
            };
        }

        let mut tags = BTreeSet::new();
        let mut evidence = Vec::new();

        for lexicon in &self.vocabulary.tag_lexicons {
            for phrase in &lexicon.phrases {
                if record.free_text.contains(phrase.as_str()) {
                    tags.insert(lexicon.tag);
                    evidence.push(TagEvidence {
                        tag: lexicon.tag,
                        phrase: phrase.clone(),
                        field: EvidenceField::FreeText,
                    });
                }
                for term in &record.coded_terms {
                    if term.display.to_lowercase().contains(phrase.as_str()) {
                        tags.insert(lexicon.tag);
                        evidence.push(TagEvidence {
                            tag: lexicon.tag,
                            phrase: phrase.clone(),
                            field: EvidenceField::CodedTermDisplay,
                        });
                    }
                }
            }
        }

        self.apply_boundary_precedence(&record, &mut tags, &mut evidence);

        let dose = if tags.contains(&Tag::DoseInformation) {
            extract_dose(&record.free_text, self.vocabulary)
        } else {
            None
        };

        TaggedRecord {
            record,
            tags,
            tag_evidence: evidence,
            dose,
        }
    }

    /// A record matching both start and end vocabulary keeps only one
    /// boundary tag: the one whose matched phrase is longer (more
    /// specific). On an exact length tie, `CourseEnd` wins only when the
    /// record's status indicates completion, else `CourseStart`.
    fn apply_boundary_precedence(
        &self,
        record: &NormalizedRecord,
        tags: &mut BTreeSet<Tag>,
        evidence: &mut Vec<TagEvidence>,
    ) {
        if !(tags.contains(&Tag::CourseStart) && tags.contains(&Tag::CourseEnd)) {
            return;
        }

        let longest = |tag: Tag| {
            evidence
                .iter()
                .filter(|e| e.tag == tag)
                .map(|e| e.phrase.len())
                .max()
                .unwrap_or(0)
        };
        let start_len = longest(Tag::CourseStart);
        let end_len = longest(Tag::CourseEnd);

        let keep = if end_len > start_len {
            Tag::CourseEnd
        } else if start_len > end_len {
            Tag::CourseStart
        } else if self.vocabulary.indicates_completion(&record.status) {
            Tag::CourseEnd
        } else {
            Tag::CourseStart
        };
        let drop = if keep == Tag::CourseEnd {
            Tag::CourseStart
        } else {
            Tag::CourseEnd
        };

        tags.remove(&drop);
        evidence.retain(|e| e.tag != drop);
    }
}

/// Best-effort extraction of the first value carrying a recognized dose
/// unit. Number-word pairs with other words ("30 fractions") are passed
/// over. Returns None on any parse trouble; never fails.
fn extract_dose(text: &str, vocabulary: &Vocabulary) -> Option<DoseValue> {
    for caps in RE_DOSE.captures_iter(text) {
        let (Some(value_match), Some(unit_match)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let unit = unit_match.as_str();
        if !vocabulary.dose_units.iter().any(|u| u == unit) {
            continue;
        }
        let value: f64 = value_match.as_str().parse().ok()?;
        return Some(DoseValue {
            value,
            unit: unit.to_string(),
        });
    }
    None
}
