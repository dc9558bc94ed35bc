//! # vsd2doc
//!
//! Batch-convert Visio diagram files into Word documents by driving the two
//! desktop applications through their scripting interfaces.
//!
//! ## Why this crate?
//!
//! Visio diagrams embedded in process documentation go stale the moment they
//! are screenshotted by hand. This crate automates the round trip: it opens
//! each diagram in the (hidden) diagram application, moves every page into a
//! Word-compatible document — by clipboard copy or by rasterised image — and
//! saves the result, with deterministic ordering, per-file progress events,
//! and guaranteed teardown of both applications even when a page fails
//! halfway through.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source directory
//!  │
//!  ├─ 1. Hygiene    kill stale Visio / Word / WPS instances (optional)
//!  ├─ 2. Enumerate  list *.vsd / *.vsdx, sorted, case-insensitive
//!  ├─ 3. Hosts      start the diagram app (hidden), probe + start the
//!  │                document app family (Word, or Kwps → Wps)
//!  ├─ 4. Transfer   per file, per page: copy-paste or export-insert,
//!  │                page breaks between pages (and between files when merged)
//!  ├─ 5. Save       output.docx, or Converted_Files/<base>.docx per file
//!  └─ 6. Teardown   quit both applications on every exit path
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vsd2doc::{convert, ConversionRequest, OutputMode, TransferMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let files = vsd2doc::list_sources("diagrams/".as_ref())?;
//!     let request = ConversionRequest::builder()
//!         .source_dir("diagrams/")
//!         .files(files)
//!         .transfer(TransferMode::Copy)
//!         .output(OutputMode::Merged)
//!         .build()?;
//!     let outcome = convert(&request).await?;
//!     println!("wrote {:?}", outcome.outputs);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `vsd2doc` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! vsd2doc = { version = "0.3", default-features = false }
//! ```
//!
//! ## Automation backends
//!
//! The pipeline talks to the applications through the [`host::HostFactory`]
//! seam. This build ships no native COM binding; embedders inject their
//! backend on the request, and tests and dry runs use the deterministic
//! [`host::scripted::ScriptedFactory`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod host;
pub mod hygiene;
pub mod outcome;
pub mod progress;
pub mod sources;
pub mod transfer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionRequest, ConversionRequestBuilder, DocumentFamily, ImageFormat, OutputMode,
    TransferMode,
};
pub use convert::{convert, convert_sync, MERGED_OUTPUT, OUTPUT_SUBDIR};
pub use error::ConvertError;
pub use export::{export_images, export_images_sync};
pub use outcome::{ConversionOutcome, RunStats};
pub use progress::{
    progress_channel, ChannelProgress, ConversionProgress, NoopProgress, ProgressCallback,
    ProgressEvent,
};
pub use sources::{list_sources, SOURCE_EXTENSIONS};
