//! The conversion orchestrator: drive both host applications through one
//! run, strictly sequentially, with guaranteed teardown.
//!
//! ## Why spawn_blocking?
//!
//! Every automation call is synchronous and the host applications' scripting
//! surfaces are single-threaded, so the whole pipeline executes on one
//! dedicated blocking worker. The async entry points exist so a UI or server
//! can await a run without tying up its own threads; nothing inside the run
//! is concurrent.
//!
//! ## Run shape
//!
//! ```text
//! start diagram app (hidden, first)
//!   └─ probe + start document app        failure here still quits the diagram app
//!        └─ merged: create shared destination + end cursor
//!             └─ per file, in list order:
//!                  progress event → open source
//!                  separated: fresh destination + cursor
//!                  per page: activate → transfer → separator (not after the
//!                            destination's final page)
//!                  close source (always, even when a page failed)
//!                  separated: save Converted_Files/<base>.docx, close
//!        └─ merged: save output.docx, close
//!   └─ quit document app, quit diagram app (best-effort, every exit path)
//! ```
//!
//! There are no retries and no partial success: the first failure aborts the
//! remainder of the run and surfaces as the run's single error, after
//! teardown has been attempted.

use crate::config::{ConversionRequest, OutputMode};
use crate::error::ConvertError;
use crate::host::{
    self, CursorId, DestDocId, DiagramHost, DocumentHost, HostFactory,
};
use crate::outcome::{ConversionOutcome, RunStats};
use crate::progress::{ConversionProgress, NoopProgress, ProgressEvent};
use crate::transfer::{self, PageContext, PageTransfer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Directory created under the source directory for per-file outputs.
pub const OUTPUT_SUBDIR: &str = "Converted_Files";

/// File name of the merged-mode output document.
pub const MERGED_OUTPUT: &str = "output.docx";

/// Convert a batch of diagram files into Word documents.
///
/// This is the primary entry point for the library. The request's file list
/// is processed in order; merged mode writes `<source_dir>/output.docx`,
/// separated mode writes `<source_dir>/Converted_Files/<base>.docx` per file.
///
/// # Errors
/// Any failure aborts the whole run. Host applications acquired before the
/// failure are still told to quit.
pub async fn convert(request: &ConversionRequest) -> Result<ConversionOutcome, ConvertError> {
    let request = request.clone();
    tokio::task::spawn_blocking(move || run_conversion(&request))
        .await
        .map_err(|e| ConvertError::Internal(format!("conversion worker panicked: {e}")))?
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally; do not call from inside an
/// async context.
pub fn convert_sync(request: &ConversionRequest) -> Result<ConversionOutcome, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(convert(request))
}

/// Pick the automation backend for a request: an injected factory wins,
/// otherwise the platform default.
pub(crate) fn resolve_factory(
    request: &ConversionRequest,
) -> Result<Arc<dyn HostFactory>, ConvertError> {
    if let Some(ref factory) = request.host_factory {
        return Ok(Arc::clone(factory));
    }
    host::default_factory()
}

/// Blocking implementation of one full run.
fn run_conversion(request: &ConversionRequest) -> Result<ConversionOutcome, ConvertError> {
    let start = Instant::now();
    let factory = resolve_factory(request)?;
    let progress: Arc<dyn ConversionProgress> = request
        .progress
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgress));

    info!(
        dir = %request.source_dir.display(),
        files = request.files.len(),
        transfer = ?request.transfer,
        output = ?request.output,
        family = %request.family,
        "starting conversion run"
    );
    progress.on_run_start(request.files.len());

    // The diagram application starts first; if the document application then
    // fails to start, the diagram instance must still be released.
    let mut diagram = factory.open_diagram_host()?;
    let mut document =
        match host::resolve_document_host(factory.as_ref(), request.family, request.app_visible) {
            Ok(d) => d,
            Err(e) => {
                quit_host("diagram", || diagram.quit());
                return Err(e);
            }
        };

    let result = run_files(request, &mut *diagram, &mut *document, progress.as_ref());

    // Both applications are quit explicitly on every exit path; pre-run
    // hygiene is a safety net for crashed runs, not the cleanup mechanism.
    quit_host("document", || document.quit());
    quit_host("diagram", || diagram.quit());

    let (outputs, pages) = result?;
    let stats = RunStats {
        files: request.files.len(),
        pages,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    progress.on_run_complete(request.files.len(), outputs.len());
    info!(
        outputs = outputs.len(),
        pages, ms = stats.duration_ms,
        "conversion run complete"
    );
    Ok(ConversionOutcome { outputs, stats })
}

fn quit_host(which: &str, quit: impl FnOnce() -> Result<(), ConvertError>) {
    if let Err(e) = quit() {
        warn!(application = which, error = %e, "application did not quit cleanly");
    }
}

/// Process every file of the request against already-started hosts.
///
/// Returns the output paths (in processing order) and the total page count.
fn run_files(
    request: &ConversionRequest,
    diagram: &mut dyn DiagramHost,
    document: &mut dyn DocumentHost,
    progress: &dyn ConversionProgress,
) -> Result<(Vec<PathBuf>, usize), ConvertError> {
    let strategy = transfer::strategy_for(request.transfer, request.image_format);
    let total = request.files.len();
    let mut outputs = Vec::new();
    let mut pages_done = 0usize;

    // Merged mode shares one destination and one end-of-content cursor
    // across every file; the cursor only ever advances.
    let merged: Option<(DestDocId, CursorId)> = match request.output {
        OutputMode::Merged => {
            let doc = document.new_document()?;
            let cursor = document.end_of_content(doc)?;
            Some((doc, cursor))
        }
        OutputMode::Separated => None,
    };

    for (idx, file_name) in request.files.iter().enumerate() {
        let last_file = idx + 1 == total;
        progress.on_file_start(&ProgressEvent {
            file_name: file_name.clone(),
            index: idx + 1,
            total,
        });
        info!(file = %file_name, index = idx + 1, total, "converting source file");

        let (dest, cursor) = match merged {
            Some(pair) => pair,
            None => {
                let doc = document.new_document()?;
                let cursor = document.end_of_content(doc)?;
                (doc, cursor)
            }
        };

        let source = diagram.open_document(&request.source_dir.join(file_name))?;
        let transferred = transfer_file(
            request,
            diagram,
            document,
            strategy.as_ref(),
            source,
            cursor,
            file_name,
            last_file,
        );
        // The source is closed before any page failure propagates, so the
        // next file (or the teardown) never meets a lingering handle.
        let closed = diagram.close_document(source);
        pages_done += transferred?;
        closed?;

        if request.output == OutputMode::Separated {
            let out = separated_output_path(&request.source_dir, file_name);
            ensure_parent_dir(&out)?;
            document.save_as(dest, &out)?;
            document.close_document(dest)?;
            debug!(file = %file_name, output = %out.display(), "destination saved");
            outputs.push(out);
        }
    }

    if let Some((doc, _)) = merged {
        let out = request.source_dir.join(MERGED_OUTPUT);
        document.save_as(doc, &out)?;
        document.close_document(doc)?;
        outputs.push(out);
    }

    Ok((outputs, pages_done))
}

/// Transfer every page of one source file, inserting separators.
#[allow(clippy::too_many_arguments)]
fn transfer_file(
    request: &ConversionRequest,
    diagram: &mut dyn DiagramHost,
    document: &mut dyn DocumentHost,
    strategy: &dyn PageTransfer,
    source: crate::host::SourceDocId,
    cursor: CursorId,
    file_name: &str,
    last_file: bool,
) -> Result<usize, ConvertError> {
    let page_count = diagram.page_count(source)?;
    debug!(file = %file_name, pages = page_count, "source opened");

    for page in 1..=page_count {
        diagram.activate_page(source, page)?;
        let ctx = PageContext {
            doc: source,
            file_name,
            page,
            work_dir: &request.source_dir,
        };
        strategy.transfer_page(diagram, document, cursor, &ctx)?;

        // A break follows every page except the destination's final one. In
        // a merged run the destination ends with the last page of the last
        // file, so a boundary break also lands between consecutive files.
        let final_in_destination =
            page == page_count && (request.output == OutputMode::Separated || last_file);
        if !final_in_destination {
            document.insert_page_break(cursor)?;
        }
    }

    Ok(page_count)
}

/// `<source_dir>/Converted_Files/<base>.docx` for one source file.
fn separated_output_path(source_dir: &Path, file_name: &str) -> PathBuf {
    let base = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    source_dir.join(OUTPUT_SUBDIR).join(format!("{base}.docx"))
}

fn ensure_parent_dir(path: &Path) -> Result<(), ConvertError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConvertError::OutputWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separated_output_path_uses_the_base_name() {
        let out = separated_output_path(Path::new("/work"), "flow diagram.vsdx");
        assert_eq!(
            out,
            Path::new("/work/Converted_Files/flow diagram.docx")
        );
    }

    #[test]
    fn separated_output_path_survives_extensionless_names() {
        let out = separated_output_path(Path::new("/work"), "flow");
        assert_eq!(out, Path::new("/work/Converted_Files/flow.docx"));
    }
}
