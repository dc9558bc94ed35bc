//! Progress-callback trait for per-file conversion events.
//!
//! Inject an `Arc<dyn ConversionProgress>` via
//! [`crate::config::ConversionRequestBuilder::progress`] to receive an event
//! as the pipeline reaches each source file. Events are per *file*, fired
//! before that file's pages are processed; there are no per-page events.
//!
//! # Why a callback trait, and why a channel helper?
//!
//! The callback is the least-invasive integration point: callers can forward
//! events to a progress bar, a log, or a GUI event queue without the library
//! knowing how the host application communicates. But the pipeline runs on a
//! blocking worker thread, and UI-owned state must never be touched from
//! there — so [`progress_channel`] wraps the callback in a bounded
//! single-producer/single-consumer channel. The worker blocks on a full
//! buffer instead of calling into UI code directly.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// One progress event, fired once per source file before its pages are
/// processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Name of the file about to be converted, relative to the source
    /// directory.
    pub file_name: String,
    /// 1-based position of this file in the run.
    pub index: usize,
    /// Total number of files in the run.
    pub total: usize,
}

/// Called by the pipeline as it moves through the run.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: the pipeline
/// invokes them from its worker thread, not the thread that started the run.
pub trait ConversionProgress: Send + Sync {
    /// Called once before any host application is used.
    fn on_run_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called once per source file, before that file's pages are processed.
    fn on_file_start(&self, event: &ProgressEvent) {
        let _ = event;
    }

    /// Called once after the run finished successfully.
    ///
    /// # Arguments
    /// * `total_files` — files the run was asked to convert
    /// * `outputs`     — output documents written
    fn on_run_complete(&self, total_files: usize, outputs: usize) {
        let _ = (total_files, outputs);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl ConversionProgress for NoopProgress {}

/// Convenience alias matching the type stored in
/// [`crate::config::ConversionRequest`].
pub type ProgressCallback = Arc<dyn ConversionProgress>;

/// Callback half of a [`progress_channel`] pair.
///
/// Forwards every [`ProgressEvent`] into a bounded channel. If the receiver
/// has gone away the event is dropped with a warning; a closed UI must not
/// abort a running conversion.
pub struct ChannelProgress {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ConversionProgress for ChannelProgress {
    fn on_file_start(&self, event: &ProgressEvent) {
        if self.tx.blocking_send(event.clone()).is_err() {
            warn!(file = %event.file_name, "progress receiver dropped; event discarded");
        }
    }
}

/// Create a bounded single-producer/single-consumer progress bridge.
///
/// The returned callback goes into the [`crate::config::ConversionRequest`];
/// the receiver belongs to the thread driving the UI. The worker thread
/// blocks when `bound` events are unread, which keeps memory bounded without
/// ever running UI code on the pipeline thread.
pub fn progress_channel(bound: usize) -> (Arc<ChannelProgress>, mpsc::Receiver<ProgressEvent>) {
    let (tx, rx) = mpsc::channel(bound.max(1));
    (Arc::new(ChannelProgress { tx }), rx)
}
