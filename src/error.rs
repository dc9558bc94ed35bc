//! Error types for the vsd2doc library.
//!
//! One enum covers the whole taxonomy, but its variants carry different
//! policies:
//!
//! * Pre-flight errors ([`Directory`](ConvertError::Directory),
//!   [`NoSourceFiles`](ConvertError::NoSourceFiles),
//!   [`InvalidRequest`](ConvertError::InvalidRequest)) are reported before any
//!   external application is started.
//!
//! * Run-aborting errors ([`AutomationUnavailable`](ConvertError::AutomationUnavailable),
//!   [`Transfer`](ConvertError::Transfer),
//!   [`NoCompatibleApplication`](ConvertError::NoCompatibleApplication)) stop
//!   the current run, but are always funnelled through the orchestrator's
//!   teardown so host applications are still told to quit.
//!
//! * [`Hygiene`](ConvertError::Hygiene) is non-fatal by policy: a failed
//!   pre-run kill is reported and the caller decides whether to attempt the
//!   conversion anyway.
//!
//! Nothing is retried automatically. A run either completes or surfaces one
//! error; there is no partial-success result distinguishing "files 1–3
//! converted, file 4 failed".

use crate::config::DocumentFamily;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the vsd2doc library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Pre-flight errors ─────────────────────────────────────────────────
    /// The source directory could not be read.
    #[error("Cannot read source directory '{path}': {source}\nCheck the path exists and is readable.")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Enumeration found no Visio files in the directory.
    #[error("No Visio files (.vsd/.vsdx) found in '{dir}'")]
    NoSourceFiles { dir: PathBuf },

    /// Request builder validation failed.
    #[error("Invalid conversion request: {0}")]
    InvalidRequest(String),

    // ── Application start errors ──────────────────────────────────────────
    /// Every known program identity of the document-application family
    /// failed to start.
    #[error(
        "No {family} installation could be started (tried: {})\n\
         Check that {family} is installed and its automation interface is registered.",
        tried.join(", ")
    )]
    NoCompatibleApplication {
        family: DocumentFamily,
        tried: Vec<String>,
    },

    // ── Automation errors ─────────────────────────────────────────────────
    /// A scripting call to either external application failed. Never retried;
    /// aborts the current run.
    #[error("Automation call '{call}' failed: {detail}")]
    AutomationUnavailable { call: &'static str, detail: String },

    /// A single page's content could not be moved into the destination.
    #[error("Failed to transfer page {page} of '{file}': {detail}")]
    Transfer {
        file: String,
        page: usize,
        detail: String,
    },

    // ── Process hygiene ───────────────────────────────────────────────────
    /// Forceful termination of a stale application process failed.
    ///
    /// Non-fatal: callers may proceed with the run regardless. A target that
    /// is simply not running is success, not this error.
    #[error("Could not terminate process '{process}': {detail}")]
    Hygiene { process: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// An output directory could not be created.
    #[error("Failed to prepare output location '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (worker panic, runtime construction).
    #[error("Internal error: {0}")]
    Internal(String),
}
