use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::models::Tag;

/// Phrase list backing one semantic tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagLexicon {
    pub tag: Tag,
    pub phrases: Vec<String>,
}

/// One controlled-vocabulary technique label and the phrases that map to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalityTerm {
    pub label: String,
    pub phrases: Vec<String>,
}

/// The curated keyword dictionaries consumed by the classifier and the
/// course reconstructor. Versioned, loaded once per run, read-only for
/// the run's duration. Injected explicitly — never module-level state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    pub version: String,
    pub tag_lexicons: Vec<TagLexicon>,
    pub modalities: Vec<ModalityTerm>,
    pub dose_units: Vec<String>,
    /// Status words meaning the record describes a finished activity.
    pub completion_statuses: Vec<String>,
    /// Status words meaning the record was cancelled or never performed.
    pub cancellation_statuses: Vec<String>,
}

impl Vocabulary {
    /// The compiled-in curated dictionary set.
    pub fn builtin() -> Self {
        let lex = |tag: Tag, phrases: &[&str]| TagLexicon {
            tag,
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
        };
        let modality = |label: &str, phrases: &[&str]| ModalityTerm {
            label: label.to_string(),
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
        };

        Vocabulary {
            version: "builtin-2024.2".into(),
            tag_lexicons: vec![
                lex(
                    Tag::Consultation,
                    &[
                        "consultation",
                        "initial consult",
                        "new patient visit",
                        "initial evaluation",
                        "seen in consultation",
                    ],
                ),
                lex(
                    Tag::Simulation,
                    &[
                        "simulation",
                        "ct sim",
                        "sim review",
                        "marking session",
                        "treatment planning scan",
                    ],
                ),
                lex(
                    Tag::CourseStart,
                    &[
                        "first treatment",
                        "first fraction",
                        "treatment started",
                        "start of treatment",
                        "began radiation",
                        "radiation started",
                    ],
                ),
                lex(
                    Tag::CourseEnd,
                    &[
                        "final treatment",
                        "last fraction",
                        "treatment completed",
                        "completion of radiation",
                        "end of treatment",
                        "course completed",
                    ],
                ),
                lex(
                    Tag::TreatmentSession,
                    &[
                        "daily treatment",
                        "fraction delivered",
                        "treatment delivered",
                        "on-treatment visit",
                        "weekly treatment check",
                    ],
                ),
                lex(
                    Tag::Retreatment,
                    &["retreatment", "re-treatment", "reirradiation", "re-irradiation"],
                ),
                lex(
                    Tag::PriorTreatmentHistory,
                    &[
                        "prior radiation",
                        "previous radiation",
                        "history of radiation",
                        "previously irradiated",
                        "s/p radiation",
                    ],
                ),
                lex(
                    Tag::DoseInformation,
                    &["total dose", "prescribed dose", "dose delivered", "cumulative dose"],
                ),
            ],
            modalities: vec![
                modality("3d_conformal", &["3d conformal", "3d-crt", "3dcrt"]),
                modality("imrt", &["imrt", "intensity modulated"]),
                modality("vmat", &["vmat", "volumetric modulated arc"]),
                modality("sbrt", &["sbrt", "stereotactic body"]),
                modality("srs", &["srs", "stereotactic radiosurgery"]),
                modality("brachytherapy", &["brachytherapy", "hdr implant", "ldr implant"]),
                modality("electron", &["electron beam", "electrons"]),
                modality("proton", &["proton beam", "proton therapy"]),
            ],
            dose_units: vec!["gy".into(), "cgy".into()],
            completion_statuses: vec![
                "completed".into(),
                "fulfilled".into(),
                "finished".into(),
                "final".into(),
            ],
            cancellation_statuses: vec![
                "cancelled".into(),
                "canceled".into(),
                "not-done".into(),
                "entered-in-error".into(),
                "aborted".into(),
            ],
        }
    }

    /// Load a versioned replacement dictionary from JSON. Phrases,
    /// dose units, and status words are lower-cased on load; matching
    /// is always case-insensitive.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let mut vocab: Vocabulary = serde_json::from_str(json)?;
        for lexicon in &mut vocab.tag_lexicons {
            if lexicon.tag == Tag::Unclassified {
                return Err(EngineError::InvalidConfig(
                    "unclassified is a fallback tag and may not carry phrases".into(),
                ));
            }
            for phrase in &mut lexicon.phrases {
                *phrase = phrase.to_lowercase();
            }
        }
        for term in &mut vocab.modalities {
            for phrase in &mut term.phrases {
                *phrase = phrase.to_lowercase();
            }
        }
        for word in vocab
            .dose_units
            .iter_mut()
            .chain(vocab.completion_statuses.iter_mut())
            .chain(vocab.cancellation_statuses.iter_mut())
        {
            *word = word.to_lowercase();
        }
        if vocab.version.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "vocabulary version must be non-empty".into(),
            ));
        }
        Ok(vocab)
    }

    pub fn phrases_for(&self, tag: Tag) -> &[String] {
        self.tag_lexicons
            .iter()
            .find(|l| l.tag == tag)
            .map(|l| l.phrases.as_slice())
            .unwrap_or(&[])
    }

    /// True when a source status string indicates a finished activity.
    pub fn indicates_completion(&self, status: &str) -> bool {
        let lower = status.to_lowercase();
        self.completion_statuses.iter().any(|s| lower.contains(s.as_str()))
    }

    /// True when a source status string indicates the activity never
    /// happened. Such records are kept for audit but excluded from
    /// course-boundary inference.
    pub fn indicates_cancellation(&self, status: &str) -> bool {
        let lower = status.to_lowercase();
        self.cancellation_statuses.iter().any(|s| lower.contains(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_phrases_for_every_non_fallback_tag() {
        let vocab = Vocabulary::builtin();
        for tag in [
            Tag::Consultation,
            Tag::Simulation,
            Tag::CourseStart,
            Tag::CourseEnd,
            Tag::TreatmentSession,
            Tag::Retreatment,
            Tag::PriorTreatmentHistory,
            Tag::DoseInformation,
        ] {
            assert!(!vocab.phrases_for(tag).is_empty(), "no phrases for {tag}");
        }
        assert!(vocab.phrases_for(Tag::Unclassified).is_empty());
    }

    #[test]
    fn builtin_phrases_are_lowercase() {
        let vocab = Vocabulary::builtin();
        for lexicon in &vocab.tag_lexicons {
            for phrase in &lexicon.phrases {
                assert_eq!(phrase, &phrase.to_lowercase());
            }
        }
        for word in vocab
            .dose_units
            .iter()
            .chain(&vocab.completion_statuses)
            .chain(&vocab.cancellation_statuses)
        {
            assert_eq!(word, &word.to_lowercase());
        }
    }

    #[test]
    fn json_roundtrip_preserves_version() {
        let vocab = Vocabulary::builtin();
        let json = serde_json::to_string(&vocab).unwrap();
        let loaded = Vocabulary::from_json(&json).unwrap();
        assert_eq!(loaded.version, vocab.version);
        assert_eq!(loaded.tag_lexicons.len(), vocab.tag_lexicons.len());
    }

    #[test]
    fn json_load_lowercases_phrases() {
        let mut vocab = Vocabulary::builtin();
        vocab.tag_lexicons[0].phrases.push("Initial CONSULT note".into());
        let json = serde_json::to_string(&vocab).unwrap();
        let loaded = Vocabulary::from_json(&json).unwrap();
        assert!(loaded.tag_lexicons[0]
            .phrases
            .contains(&"initial consult note".to_string()));
    }

    #[test]
    fn json_load_lowercases_units_and_statuses() {
        let mut vocab = Vocabulary::builtin();
        vocab.dose_units = vec!["Gy".into(), "cGy".into()];
        vocab.completion_statuses = vec!["Completed".into()];
        vocab.cancellation_statuses = vec!["Cancelled".into()];
        let json = serde_json::to_string(&vocab).unwrap();
        let loaded = Vocabulary::from_json(&json).unwrap();
        assert_eq!(loaded.dose_units, vec!["gy".to_string(), "cgy".to_string()]);
        assert!(loaded.indicates_completion("completed"));
        assert!(loaded.indicates_cancellation("cancelled"));
    }

    #[test]
    fn unclassified_lexicon_rejected() {
        let mut vocab = Vocabulary::builtin();
        vocab.tag_lexicons.push(TagLexicon {
            tag: Tag::Unclassified,
            phrases: vec!["anything".into()],
        });
        let json = serde_json::to_string(&vocab).unwrap();
        assert!(Vocabulary::from_json(&json).is_err());
    }

    #[test]
    fn completion_and_cancellation_statuses() {
        let vocab = Vocabulary::builtin();
        assert!(vocab.indicates_completion("Completed"));
        assert!(vocab.indicates_completion("order fulfilled"));
        assert!(!vocab.indicates_completion("in-progress"));
        assert!(vocab.indicates_cancellation("CANCELLED"));
        assert!(vocab.indicates_cancellation("not-done"));
        assert!(!vocab.indicates_cancellation("active"));
    }
}
