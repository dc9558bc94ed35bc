//! Automation host adapter: the seam between the pipeline and the two
//! external desktop applications.
//!
//! ## Why blocking traits with `&mut self`?
//!
//! Both applications expose single-threaded, stateful scripting surfaces —
//! a current page, a current selection, a current cursor — that corrupt under
//! interleaved access. Taking `&mut self` on every call makes concurrent use
//! of one host unrepresentable in the type system; the orchestrator drives
//! each host strictly sequentially from one worker thread.
//!
//! ## Handles
//!
//! Documents and cursors are identified by opaque copyable ids issued by the
//! host implementation. The orchestrator owns each id for a bounded scope:
//! a source document is closed before the next one is opened, a destination
//! is closed once saved, and nothing outlives the run.
//!
//! Implementations translate every native scripting fault into
//! [`ConvertError::AutomationUnavailable`]; the pipeline never retries them.

pub mod scripted;

use crate::config::{DocumentFamily, ImageFormat};
use crate::error::ConvertError;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Handle to an open source (diagram) document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceDocId(pub u64);

/// Handle to a destination document under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DestDocId(pub u64);

/// Handle to a write cursor positioned in a destination document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorId(pub u64);

/// Scripting surface of the diagram application.
///
/// Pages are addressed by 1-based ordinal in document order.
pub trait DiagramHost: Send {
    /// Open a source document. The handle must be closed via
    /// [`close_document`](DiagramHost::close_document) before the next file
    /// is opened or the run ends.
    fn open_document(&mut self, path: &Path) -> Result<SourceDocId, ConvertError>;

    fn page_count(&mut self, doc: SourceDocId) -> Result<usize, ConvertError>;

    /// Point the application's active view at the given page. Mutates global
    /// view state; required before [`copy_active_page`](DiagramHost::copy_active_page).
    fn activate_page(&mut self, doc: SourceDocId, page: usize) -> Result<(), ConvertError>;

    /// Select the active page's entire content and copy it to the shared
    /// clipboard. Mutates the application's selection state.
    fn copy_active_page(&mut self) -> Result<(), ConvertError>;

    /// Render one page straight to a raster file. Touches neither the active
    /// view nor the clipboard.
    fn export_page(
        &mut self,
        doc: SourceDocId,
        page: usize,
        path: &Path,
        format: ImageFormat,
    ) -> Result<(), ConvertError>;

    fn close_document(&mut self, doc: SourceDocId) -> Result<(), ConvertError>;

    /// Shut the application down. Best-effort at run end.
    fn quit(&mut self) -> Result<(), ConvertError>;
}

/// Scripting surface of the document-authoring application.
pub trait DocumentHost: Send {
    fn new_document(&mut self) -> Result<DestDocId, ConvertError>;

    /// A cursor at the document's end of content. All insertions through the
    /// cursor advance it past the inserted content.
    fn end_of_content(&mut self, doc: DestDocId) -> Result<CursorId, ConvertError>;

    /// Paste the clipboard at the cursor.
    fn paste(&mut self, cursor: CursorId) -> Result<(), ConvertError>;

    /// Insert the image file at the cursor.
    fn insert_image(&mut self, cursor: CursorId, image: &Path) -> Result<(), ConvertError>;

    /// Insert a page break at the cursor.
    fn insert_page_break(&mut self, cursor: CursorId) -> Result<(), ConvertError>;

    fn save_as(&mut self, doc: DestDocId, path: &Path) -> Result<(), ConvertError>;

    fn close_document(&mut self, doc: DestDocId) -> Result<(), ConvertError>;

    /// Shut the application down. Best-effort at run end.
    fn quit(&mut self) -> Result<(), ConvertError>;
}

impl std::fmt::Debug for dyn DocumentHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn DocumentHost")
    }
}

/// Acquires host applications for a run.
///
/// One factory serves a whole run; the orchestrator opens the diagram host
/// first, then resolves the document host by probing the family's program
/// identities.
pub trait HostFactory: Send + Sync {
    /// Start the diagram application in non-interactive (hidden) mode.
    fn open_diagram_host(&self) -> Result<Box<dyn DiagramHost>, ConvertError>;

    /// Start one concrete program identity of the document application.
    fn open_document_host(
        &self,
        prog_id: &str,
        visible: bool,
    ) -> Result<Box<dyn DocumentHost>, ConvertError>;
}

impl std::fmt::Debug for dyn HostFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn HostFactory")
    }
}

/// Start the document application for `family`, probing its program
/// identities in fixed preference order and succeeding on the first that
/// starts.
///
/// Only when every identity fails does this return
/// [`ConvertError::NoCompatibleApplication`], listing what was tried.
pub fn resolve_document_host(
    factory: &dyn HostFactory,
    family: DocumentFamily,
    visible: bool,
) -> Result<Box<dyn DocumentHost>, ConvertError> {
    let mut tried = Vec::new();
    for prog_id in family.prog_ids() {
        match factory.open_document_host(prog_id, visible) {
            Ok(host) => {
                info!(%prog_id, %family, "document application started");
                return Ok(host);
            }
            Err(e) => {
                debug!(%prog_id, error = %e, "program identity failed to start");
                tried.push(prog_id.to_string());
            }
        }
    }
    Err(ConvertError::NoCompatibleApplication { family, tried })
}

/// The factory used when a request carries none.
///
/// This build ships no native automation backend — binding to the live COM
/// surface lives with the embedding application. Embedders supply their
/// backend via [`crate::config::ConversionRequestBuilder::host_factory`];
/// the CLI's `--dry-run` mode uses [`scripted::ScriptedFactory`].
pub fn default_factory() -> Result<Arc<dyn HostFactory>, ConvertError> {
    Err(ConvertError::AutomationUnavailable {
        call: "default_factory",
        detail: "no native automation backend in this build; \
                 supply a HostFactory on the request or use --dry-run"
            .into(),
    })
}

#[cfg(test)]
mod tests {
    use super::scripted::ScriptedFactory;
    use super::*;

    #[test]
    fn probing_stops_at_first_working_identity() {
        let factory = ScriptedFactory::new().with_default_pages(1);
        let _host = resolve_document_host(&factory, DocumentFamily::Wps, false).unwrap();
        // First identity in probe order wins when nothing fails.
        assert!(factory
            .prog_ids_started()
            .contains(&"Kwps.Application".to_string()));
    }

    #[test]
    fn probing_reports_every_failed_identity() {
        let factory = ScriptedFactory::new()
            .with_failing_prog_id("Kwps.Application")
            .with_failing_prog_id("Wps.Application");
        let err = resolve_document_host(&factory, DocumentFamily::Wps, false).unwrap_err();
        match err {
            ConvertError::NoCompatibleApplication { family, tried } => {
                assert_eq!(family, DocumentFamily::Wps);
                assert_eq!(tried, vec!["Kwps.Application", "Wps.Application"]);
            }
            other => panic!("expected NoCompatibleApplication, got {other}"),
        }
    }

    #[test]
    fn default_factory_is_unavailable_without_a_backend() {
        let err = default_factory().unwrap_err();
        assert!(matches!(err, ConvertError::AutomationUnavailable { .. }));
    }
}
