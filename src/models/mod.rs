pub mod course;
pub mod enums;
pub mod record;
pub mod summary;

pub use course::{Course, CourseWarning};
pub use enums::{SourceKind, Tag};
pub use record::{
    CodedTerm, DoseValue, EvidenceField, NormalizedRecord, RawRow, TagEvidence, TaggedRecord,
};
pub use summary::{SourceFailure, SubjectOutcome, SubjectSummary};
