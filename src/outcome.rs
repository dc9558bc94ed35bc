//! Result types for a finished run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Counters for one completed conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Source files processed.
    pub files: usize,
    /// Pages transferred across all files.
    pub pages: usize,
    /// Wall-clock duration of the whole run.
    pub duration_ms: u64,
}

/// What a successful conversion run produced.
///
/// `outputs` holds exactly one path in merged mode and one path per source
/// file in separated mode, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub outputs: Vec<PathBuf>,
    pub stats: RunStats,
}
