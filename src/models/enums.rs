use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Variant declaration order defines `Ord`, which the merger relies on
/// for deterministic tie-breaking.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(EngineError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// Declaration order is merge priority: visit records sort before plan
// records, plan records before order records, then the note sources.
str_enum!(SourceKind {
    VisitRecord => "visit_record",
    PlanRecord => "plan_record",
    OrderRecord => "order_record",
    PlanNote => "plan_note",
    OrderNote => "order_note",
    ProcedureCode => "procedure_code",
});

impl SourceKind {
    /// All source kinds in merge-priority order.
    pub const ALL: [SourceKind; 6] = [
        SourceKind::VisitRecord,
        SourceKind::PlanRecord,
        SourceKind::OrderRecord,
        SourceKind::PlanNote,
        SourceKind::OrderNote,
        SourceKind::ProcedureCode,
    ];

    /// Fixed tie-break priority for the merger (lower sorts first).
    pub fn merge_priority(&self) -> u8 {
        *self as u8
    }
}

str_enum!(Tag {
    Consultation => "consultation",
    Simulation => "simulation",
    CourseStart => "course_start",
    CourseEnd => "course_end",
    TreatmentSession => "treatment_session",
    Retreatment => "retreatment",
    PriorTreatmentHistory => "prior_treatment_history",
    DoseInformation => "dose_information",
    Unclassified => "unclassified",
});

impl Tag {
    /// Tags that identify the same real-world event for deduplication.
    pub fn is_dedup_anchor(&self) -> bool {
        matches!(self, Tag::CourseStart | Tag::CourseEnd | Tag::Consultation)
    }

    /// Tags that mark a course boundary.
    pub fn is_boundary(&self) -> bool {
        matches!(self, Tag::CourseStart | Tag::CourseEnd)
    }
}
