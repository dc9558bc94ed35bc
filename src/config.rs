//! Configuration types for a conversion run.
//!
//! Everything a run needs is carried by one immutable [`ConversionRequest`],
//! built via [`ConversionRequestBuilder`]. Keeping every knob in one struct
//! makes it trivial to hand the whole request to the worker thread, serialise
//! it for logging, and diff two runs to understand why their outputs differ.
//!
//! The document application's visibility is an explicit field of the request
//! rather than process-wide state, so two concurrent embedders can disagree
//! about it.

use crate::error::ConvertError;
use crate::host::HostFactory;
use crate::progress::ConversionProgress;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// How a page's visual content is moved into the destination document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransferMode {
    /// Select-and-copy the page in the diagram application, paste at the
    /// destination cursor. Mutates the diagram application's selection state.
    #[default]
    Copy,
    /// Export the page to a temporary image file, insert the image at the
    /// cursor, delete the file. No clipboard involvement.
    Export,
}

/// Whether all source files accumulate into one destination document or each
/// source file yields its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputMode {
    /// One shared document saved as `<source_dir>/output.docx`.
    #[default]
    Merged,
    /// One document per source file, saved as
    /// `<source_dir>/Converted_Files/<base>.docx`.
    Separated,
}

/// The document-authoring application family driving the destination side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocumentFamily {
    /// Microsoft Word.
    #[default]
    Word,
    /// The WPS Office family. Ships under two program identities depending on
    /// the installed edition; both are probed in preference order.
    Wps,
}

impl DocumentFamily {
    /// Automation program identities, in fixed probe order. The first one
    /// that starts wins.
    pub fn prog_ids(&self) -> &'static [&'static str] {
        match self {
            DocumentFamily::Word => &["Word.Application"],
            DocumentFamily::Wps => &["Kwps.Application", "Wps.Application"],
        }
    }

    /// Process image names targeted by pre-run hygiene.
    pub fn process_names(&self) -> &'static [&'static str] {
        match self {
            DocumentFamily::Word => &["winword.exe"],
            DocumentFamily::Wps => &["wps.exe"],
        }
    }
}

impl fmt::Display for DocumentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFamily::Word => write!(f, "Word"),
            DocumentFamily::Wps => write!(f, "WPS"),
        }
    }
}

/// Raster format for exported page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    /// Lossless; the default. Line art and text stay crisp.
    #[default]
    Png,
    Jpg,
    Gif,
}

impl ImageFormat {
    /// Lower-case file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Gif => "gif",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Everything one conversion run needs. Immutable for the duration of the run.
///
/// Built via [`ConversionRequest::builder()`].
///
/// # Example
/// ```rust,no_run
/// use vsd2doc::{ConversionRequest, OutputMode, TransferMode};
///
/// let request = ConversionRequest::builder()
///     .source_dir("diagrams/")
///     .files(vec!["flow.vsdx".into(), "network.vsd".into()])
///     .transfer(TransferMode::Export)
///     .output(OutputMode::Separated)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionRequest {
    /// Directory holding the source files; also the work directory for
    /// temporary page images and the root of all output paths.
    pub source_dir: PathBuf,

    /// Ordered source file names, relative to `source_dir`. Processing order
    /// is exactly this order.
    pub files: Vec<String>,

    /// Page-transfer strategy.
    pub transfer: TransferMode,

    /// Destination assembly mode.
    pub output: OutputMode,

    /// Which document-authoring application family to drive.
    pub family: DocumentFamily,

    /// Whether the document application window is shown while the run is in
    /// progress. The diagram application is always started hidden.
    pub app_visible: bool,

    /// Raster format used by the export strategy and the image-export
    /// pipeline.
    pub image_format: ImageFormat,

    /// Automation backend. When `None`, the platform default is used.
    ///
    /// Tests and embedders inject their own factory here, the same way a
    /// pre-built provider overrides environment detection elsewhere.
    pub host_factory: Option<Arc<dyn HostFactory>>,

    /// Per-file progress sink. `None` means no progress reporting.
    pub progress: Option<Arc<dyn ConversionProgress>>,
}

impl fmt::Debug for ConversionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRequest")
            .field("source_dir", &self.source_dir)
            .field("files", &self.files)
            .field("transfer", &self.transfer)
            .field("output", &self.output)
            .field("family", &self.family)
            .field("app_visible", &self.app_visible)
            .field("image_format", &self.image_format)
            .field(
                "host_factory",
                &self.host_factory.as_ref().map(|_| "<dyn HostFactory>"),
            )
            .field(
                "progress",
                &self.progress.as_ref().map(|_| "<dyn ConversionProgress>"),
            )
            .finish()
    }
}

impl ConversionRequest {
    /// Create a new builder.
    pub fn builder() -> ConversionRequestBuilder {
        ConversionRequestBuilder::default()
    }
}

/// Builder for [`ConversionRequest`].
#[derive(Default)]
pub struct ConversionRequestBuilder {
    source_dir: PathBuf,
    files: Vec<String>,
    transfer: TransferMode,
    output: OutputMode,
    family: DocumentFamily,
    app_visible: bool,
    image_format: ImageFormat,
    host_factory: Option<Arc<dyn HostFactory>>,
    progress: Option<Arc<dyn ConversionProgress>>,
}

impl ConversionRequestBuilder {
    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    /// Replace the ordered file list.
    pub fn files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    /// Append one file name, preserving insertion order.
    pub fn file(mut self, name: impl Into<String>) -> Self {
        self.files.push(name.into());
        self
    }

    pub fn transfer(mut self, mode: TransferMode) -> Self {
        self.transfer = mode;
        self
    }

    pub fn output(mut self, mode: OutputMode) -> Self {
        self.output = mode;
        self
    }

    pub fn family(mut self, family: DocumentFamily) -> Self {
        self.family = family;
        self
    }

    pub fn app_visible(mut self, visible: bool) -> Self {
        self.app_visible = visible;
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    pub fn host_factory(mut self, factory: Arc<dyn HostFactory>) -> Self {
        self.host_factory = Some(factory);
        self
    }

    pub fn progress(mut self, progress: Arc<dyn ConversionProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Build the request, validating constraints.
    ///
    /// An empty file list is rejected with [`ConvertError::NoSourceFiles`]:
    /// a request over nothing cannot exist, so the orchestrator is never even
    /// invoked for an empty directory.
    pub fn build(self) -> Result<ConversionRequest, ConvertError> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(ConvertError::InvalidRequest(
                "source_dir must be set".into(),
            ));
        }
        if self.files.is_empty() {
            return Err(ConvertError::NoSourceFiles {
                dir: self.source_dir,
            });
        }
        Ok(ConversionRequest {
            source_dir: self.source_dir,
            files: self.files,
            transfer: self.transfer,
            output: self.output,
            family: self.family,
            app_visible: self.app_visible,
            image_format: self.image_format,
            host_factory: self.host_factory,
            progress: self.progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let req = ConversionRequest::builder()
            .source_dir("/tmp/diagrams")
            .file("a.vsdx")
            .build()
            .unwrap();
        assert_eq!(req.transfer, TransferMode::Copy);
        assert_eq!(req.output, OutputMode::Merged);
        assert_eq!(req.family, DocumentFamily::Word);
        assert!(!req.app_visible);
        assert_eq!(req.image_format, ImageFormat::Png);
    }

    #[test]
    fn builder_rejects_empty_file_list() {
        let err = ConversionRequest::builder()
            .source_dir("/tmp/diagrams")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::NoSourceFiles { .. }));
    }

    #[test]
    fn builder_rejects_missing_source_dir() {
        let err = ConversionRequest::builder()
            .file("a.vsdx")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidRequest(_)));
    }

    #[test]
    fn wps_probe_order_is_fixed() {
        assert_eq!(
            DocumentFamily::Wps.prog_ids(),
            ["Kwps.Application", "Wps.Application"]
        );
        assert_eq!(DocumentFamily::Word.prog_ids(), ["Word.Application"]);
    }

    #[test]
    fn debug_elides_dyn_fields() {
        let req = ConversionRequest::builder()
            .source_dir("/tmp")
            .file("a.vsd")
            .build()
            .unwrap();
        let dbg = format!("{req:?}");
        assert!(dbg.contains("source_dir"));
        assert!(!dbg.contains("Arc"));
    }

    #[test]
    fn image_format_extensions() {
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert_eq!(ImageFormat::Jpg.to_string(), "jpg");
    }
}
