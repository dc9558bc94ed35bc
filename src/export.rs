//! The image-export pipeline: every page of every source file straight to
//! raster files, no destination document at all.
//!
//! Only the diagram application is involved. Each source file gets its own
//! subdirectory, `<source_dir>/Converted_Files/<base>/`, holding
//! `Page_1.<ext>`, `Page_2.<ext>`, … in page order. Unlike the transient
//! images of the export transfer strategy, these files are the product and
//! are retained.
//!
//! A failure aborts the run and surfaces as the error it is; an empty result
//! always means "nothing to do", never "it broke halfway". Images already
//! written before a failure stay on disk.

use crate::config::ConversionRequest;
use crate::convert::{resolve_factory, OUTPUT_SUBDIR};
use crate::error::ConvertError;
use crate::host::DiagramHost;
use crate::progress::{ConversionProgress, NoopProgress, ProgressEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Export every page of every source file as an image.
///
/// Returns the full list of generated image paths, grouped by file and in
/// page order within each group.
///
/// # Errors
/// Any failure aborts the run. The diagram application is still told to quit,
/// and images exported before the failure remain on disk.
pub async fn export_images(request: &ConversionRequest) -> Result<Vec<PathBuf>, ConvertError> {
    let request = request.clone();
    tokio::task::spawn_blocking(move || run_image_export(&request))
        .await
        .map_err(|e| ConvertError::Internal(format!("export worker panicked: {e}")))?
}

/// Synchronous wrapper around [`export_images`].
pub fn export_images_sync(request: &ConversionRequest) -> Result<Vec<PathBuf>, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(export_images(request))
}

fn run_image_export(request: &ConversionRequest) -> Result<Vec<PathBuf>, ConvertError> {
    let factory = resolve_factory(request)?;
    let progress: Arc<dyn ConversionProgress> = request
        .progress
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgress));

    info!(
        dir = %request.source_dir.display(),
        files = request.files.len(),
        format = %request.image_format,
        "starting image export run"
    );
    progress.on_run_start(request.files.len());

    let mut diagram = factory.open_diagram_host()?;
    let result = export_files(request, &mut *diagram, progress.as_ref());
    if let Err(e) = diagram.quit() {
        warn!(error = %e, "diagram application did not quit cleanly");
    }

    let images = result?;
    progress.on_run_complete(request.files.len(), images.len());
    info!(images = images.len(), "image export run complete");
    Ok(images)
}

fn export_files(
    request: &ConversionRequest,
    diagram: &mut dyn DiagramHost,
    progress: &dyn ConversionProgress,
) -> Result<Vec<PathBuf>, ConvertError> {
    let total = request.files.len();
    let mut images = Vec::new();

    for (idx, file_name) in request.files.iter().enumerate() {
        progress.on_file_start(&ProgressEvent {
            file_name: file_name.clone(),
            index: idx + 1,
            total,
        });
        info!(file = %file_name, index = idx + 1, total, "exporting source file");

        let out_dir = file_output_dir(&request.source_dir, file_name);
        std::fs::create_dir_all(&out_dir).map_err(|e| ConvertError::OutputWrite {
            path: out_dir.clone(),
            source: e,
        })?;

        let source = diagram.open_document(&request.source_dir.join(file_name))?;
        let exported = export_pages(request, diagram, source, &out_dir, &mut images);
        let closed = diagram.close_document(source);
        exported?;
        closed?;
    }

    Ok(images)
}

fn export_pages(
    request: &ConversionRequest,
    diagram: &mut dyn DiagramHost,
    source: crate::host::SourceDocId,
    out_dir: &Path,
    images: &mut Vec<PathBuf>,
) -> Result<(), ConvertError> {
    let page_count = diagram.page_count(source)?;
    debug!(pages = page_count, dir = %out_dir.display(), "exporting pages");

    for page in 1..=page_count {
        let path = out_dir.join(format!("Page_{page}.{}", request.image_format.extension()));
        diagram.export_page(source, page, &path, request.image_format)?;
        images.push(path);
    }
    Ok(())
}

/// `<source_dir>/Converted_Files/<base>/` for one source file.
fn file_output_dir(source_dir: &Path, file_name: &str) -> PathBuf {
    let base = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    source_dir.join(OUTPUT_SUBDIR).join(base)
}
