use tracing_subscriber::EnvFilter;

use crate::errors::EngineError;
use crate::vocabulary::Vocabulary;

/// Library-level constants
pub const ENGINE_NAME: &str = "oncourse";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum day-gap between two events for them to belong to the same
/// course, absent explicit boundary milestones.
pub const DEFAULT_GAP_THRESHOLD_DAYS: i64 = 7;

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("{ENGINE_NAME}=info")
}

/// Initialize tracing for an embedding application. Call once.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .init();
}

/// Static, versioned configuration consumed by one run. Loaded once,
/// read-only for the run's duration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub gap_threshold_days: i64,
    pub vocabulary: Vocabulary,
}

impl EngineConfig {
    pub fn new(gap_threshold_days: i64, vocabulary: Vocabulary) -> Result<Self, EngineError> {
        if gap_threshold_days < 1 {
            return Err(EngineError::InvalidConfig(format!(
                "gap threshold must be at least 1 day, got {gap_threshold_days}"
            )));
        }
        Ok(Self {
            gap_threshold_days,
            vocabulary,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gap_threshold_days: DEFAULT_GAP_THRESHOLD_DAYS,
            vocabulary: Vocabulary::builtin(),
        }
    }
}
