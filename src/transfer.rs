//! Page transfer strategies: move one page's visual content into a
//! destination document.
//!
//! Two interchangeable algorithms implement the same contract:
//!
//! * [`CopyTransfer`] — select-and-copy the source page in the diagram
//!   application, paste at the destination cursor. Fast and lossless, but it
//!   rides on the applications' shared clipboard and selection state.
//! * [`ExportTransfer`] — rasterise the page to a temporary image file in the
//!   work directory, insert the image at the cursor, delete the file. Slower,
//!   but immune to clipboard interference and to paste quirks of the
//!   alternate application family.
//!
//! The orchestrator has already pointed the diagram application's active view
//! at the page before a strategy runs. Both strategies return only after the
//! destination cursor has advanced past the inserted content, so a following
//! separator lands after the new content.

use crate::config::{ImageFormat, TransferMode};
use crate::error::ConvertError;
use crate::host::{CursorId, DiagramHost, DocumentHost, SourceDocId};
use std::path::Path;
use tracing::warn;

/// Identifies the page a strategy is transferring.
pub struct PageContext<'a> {
    /// The open source document.
    pub doc: SourceDocId,
    /// Source file name, used for temp-file naming and error reporting.
    pub file_name: &'a str,
    /// 1-based page ordinal. The orchestrator has made this the active page.
    pub page: usize,
    /// Directory for transient artifacts (the source directory).
    pub work_dir: &'a Path,
}

/// Transfer one page into the destination document at `cursor`.
pub trait PageTransfer: Send + Sync {
    fn transfer_page(
        &self,
        diagram: &mut dyn DiagramHost,
        document: &mut dyn DocumentHost,
        cursor: CursorId,
        ctx: &PageContext<'_>,
    ) -> Result<(), ConvertError>;
}

/// Pick the strategy for a [`TransferMode`].
pub(crate) fn strategy_for(mode: TransferMode, format: ImageFormat) -> Box<dyn PageTransfer> {
    match mode {
        TransferMode::Copy => Box::new(CopyTransfer),
        TransferMode::Export => Box::new(ExportTransfer { format }),
    }
}

fn page_failure(ctx: &PageContext<'_>, err: ConvertError) -> ConvertError {
    ConvertError::Transfer {
        file: ctx.file_name.to_string(),
        page: ctx.page,
        detail: err.to_string(),
    }
}

/// Clipboard-based transfer: copy the active page, paste at the cursor.
pub struct CopyTransfer;

impl PageTransfer for CopyTransfer {
    fn transfer_page(
        &self,
        diagram: &mut dyn DiagramHost,
        document: &mut dyn DocumentHost,
        cursor: CursorId,
        ctx: &PageContext<'_>,
    ) -> Result<(), ConvertError> {
        diagram
            .copy_active_page()
            .map_err(|e| page_failure(ctx, e))?;
        document.paste(cursor).map_err(|e| page_failure(ctx, e))
    }
}

/// Raster-based transfer: export the page to a temporary image, insert it,
/// delete the file.
///
/// The temporary file is deleted unconditionally, insertion success or not,
/// so no `temp_*` file ever survives a run. Deletion failure is logged, not
/// escalated; a stranded temp file must not fail an otherwise good page.
pub struct ExportTransfer {
    pub format: ImageFormat,
}

impl ExportTransfer {
    fn temp_image_path(&self, ctx: &PageContext<'_>) -> std::path::PathBuf {
        ctx.work_dir.join(format!(
            "temp_{}_{}.{}",
            ctx.file_name,
            ctx.page,
            self.format.extension()
        ))
    }
}

impl PageTransfer for ExportTransfer {
    fn transfer_page(
        &self,
        diagram: &mut dyn DiagramHost,
        document: &mut dyn DocumentHost,
        cursor: CursorId,
        ctx: &PageContext<'_>,
    ) -> Result<(), ConvertError> {
        let image = self.temp_image_path(ctx);

        if let Err(e) = diagram.export_page(ctx.doc, ctx.page, &image, self.format) {
            // A failed export may still have left a partial file behind.
            remove_temp(&image);
            return Err(page_failure(ctx, e));
        }

        let inserted = document.insert_image(cursor, &image);
        remove_temp(&image);
        inserted.map_err(|e| page_failure(ctx, e))
    }
}

fn remove_temp(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to delete temporary page image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::scripted::ScriptedFactory;
    use crate::host::HostFactory;
    use tempfile::TempDir;

    fn open_pair(
        factory: &ScriptedFactory,
    ) -> (Box<dyn DiagramHost>, Box<dyn DocumentHost>) {
        let diagram = factory.open_diagram_host().unwrap();
        let document = factory
            .open_document_host("Word.Application", false)
            .unwrap();
        (diagram, document)
    }

    #[test]
    fn export_transfer_deletes_the_temp_image_on_success() {
        let work = TempDir::new().unwrap();
        let factory = ScriptedFactory::new().with_pages("a.vsdx", 1);
        let (mut diagram, mut document) = open_pair(&factory);

        let src = diagram.open_document(&work.path().join("a.vsdx")).unwrap();
        diagram.activate_page(src, 1).unwrap();
        let dest = document.new_document().unwrap();
        let cursor = document.end_of_content(dest).unwrap();

        let strategy = ExportTransfer {
            format: ImageFormat::Png,
        };
        let ctx = PageContext {
            doc: src,
            file_name: "a.vsdx",
            page: 1,
            work_dir: work.path(),
        };
        strategy
            .transfer_page(&mut *diagram, &mut *document, cursor, &ctx)
            .unwrap();

        assert!(
            !work.path().join("temp_a.vsdx_1.png").exists(),
            "temp image must be deleted after insertion"
        );
    }

    #[test]
    fn export_transfer_deletes_the_temp_image_on_insert_failure() {
        let work = TempDir::new().unwrap();
        let factory = ScriptedFactory::new()
            .with_pages("a.vsdx", 1)
            .with_failing_insert_containing("temp_a.vsdx_1");
        let (mut diagram, mut document) = open_pair(&factory);

        let src = diagram.open_document(&work.path().join("a.vsdx")).unwrap();
        diagram.activate_page(src, 1).unwrap();
        let dest = document.new_document().unwrap();
        let cursor = document.end_of_content(dest).unwrap();

        let strategy = ExportTransfer {
            format: ImageFormat::Png,
        };
        let ctx = PageContext {
            doc: src,
            file_name: "a.vsdx",
            page: 1,
            work_dir: work.path(),
        };
        let err = strategy
            .transfer_page(&mut *diagram, &mut *document, cursor, &ctx)
            .unwrap_err();

        assert!(matches!(err, ConvertError::Transfer { page: 1, .. }));
        assert!(
            !work.path().join("temp_a.vsdx_1.png").exists(),
            "temp image must be deleted even when insertion fails"
        );
    }

    #[test]
    fn copy_transfer_maps_failures_to_transfer_errors() {
        let factory = ScriptedFactory::new()
            .with_pages("a.vsdx", 1)
            .with_failing_paste_at(1);
        let (mut diagram, mut document) = open_pair(&factory);

        let src = diagram.open_document(Path::new("a.vsdx")).unwrap();
        diagram.activate_page(src, 1).unwrap();
        let dest = document.new_document().unwrap();
        let cursor = document.end_of_content(dest).unwrap();

        let ctx = PageContext {
            doc: src,
            file_name: "a.vsdx",
            page: 1,
            work_dir: Path::new("."),
        };
        let err = CopyTransfer
            .transfer_page(&mut *diagram, &mut *document, cursor, &ctx)
            .unwrap_err();
        match err {
            ConvertError::Transfer { file, page, .. } => {
                assert_eq!(file, "a.vsdx");
                assert_eq!(page, 1);
            }
            other => panic!("expected Transfer, got {other}"),
        }
    }
}
