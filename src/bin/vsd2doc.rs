//! CLI binary for vsd2doc.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `ConversionRequest` and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vsd2doc::host::scripted::ScriptedFactory;
use vsd2doc::{
    convert, export_images, hygiene, list_sources, ConversionProgress, ConversionRequest,
    DocumentFamily, ImageFormat, OutputMode, ProgressEvent, TransferMode,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar tick per source file. Events arrive in
/// file order from the single pipeline worker, so no out-of-order handling is
/// needed.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>2}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgress for CliProgress {
    fn on_run_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting conversion of {total_files} files…"))
        ));
    }

    fn on_file_start(&self, event: &ProgressEvent) {
        self.bar.set_position((event.index - 1) as u64);
        self.bar.set_message(event.file_name.clone());
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}",
            green("▶"),
            event.index,
            event.total,
            event.file_name
        ));
    }

    fn on_run_complete(&self, total_files: usize, outputs: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} files converted into {} output(s)",
            green("✔"),
            bold(&total_files.to_string()),
            bold(&outputs.to_string()),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Everything in a directory into one output.docx (clipboard transfer)
  vsd2doc convert ./diagrams

  # One .docx per diagram, via rasterised page images
  vsd2doc convert ./diagrams --output separated --transfer export

  # Target a WPS installation, window visible
  vsd2doc convert ./diagrams --family wps --visible

  # Rehearse a run without any application: what would be opened and written?
  vsd2doc convert ./diagrams --dry-run --assume-pages 3

  # Every page of every diagram as PNGs under Converted_Files/<name>/
  vsd2doc export-images ./diagrams

  # Deterministic source listing
  vsd2doc list ./diagrams

  # Kill stale application instances before anything else
  vsd2doc kill --family word

OUTPUT LAYOUT:
  merged       <DIR>/output.docx
  separated    <DIR>/Converted_Files/<name>.docx
  images       <DIR>/Converted_Files/<name>/Page_<n>.<ext>

NOTE:
  Conversion drives the locally installed desktop applications through an
  automation backend supplied by the embedding application. Without one,
  `convert` and `export-images` only work with --dry-run.
"#;

/// Batch-convert Visio diagrams into Word documents.
#[derive(Parser, Debug)]
#[command(
    name = "vsd2doc",
    version,
    about = "Batch-convert Visio diagrams into Word documents",
    long_about = "Convert every .vsd/.vsdx file of a directory into Word-compatible documents \
by driving the desktop applications, or export every diagram page as an image. \
Supports Microsoft Word and the WPS Office family as destination applications.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "VSD2DOC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "VSD2DOC_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert diagrams into Word documents.
    Convert(ConvertArgs),
    /// Export every diagram page as an image file.
    ExportImages(ExportArgs),
    /// List the Visio files a conversion would process, in order.
    List {
        /// Directory containing .vsd/.vsdx files.
        dir: PathBuf,
        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Forcefully terminate stale application instances.
    Kill {
        /// Document-application family whose processes are targeted
        /// alongside the diagram application.
        #[arg(long, value_enum, default_value = "word")]
        family: FamilyArg,
    },
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// Directory containing .vsd/.vsdx files; also receives the outputs.
    dir: PathBuf,

    /// Page-transfer strategy.
    #[arg(long, value_enum, env = "VSD2DOC_TRANSFER", default_value = "copy")]
    transfer: TransferArg,

    /// One merged document, or one document per source file.
    #[arg(long, value_enum, env = "VSD2DOC_OUTPUT", default_value = "merged")]
    output: OutputArg,

    /// Destination application family.
    #[arg(long, value_enum, env = "VSD2DOC_FAMILY", default_value = "word")]
    family: FamilyArg,

    /// Show the document application window during the run.
    #[arg(long, env = "VSD2DOC_VISIBLE")]
    visible: bool,

    /// Image format used by the export transfer strategy.
    #[arg(long, value_enum, env = "VSD2DOC_FORMAT", default_value = "png")]
    format: FormatArg,

    /// Skip the pre-run kill of stale application instances.
    #[arg(long)]
    skip_kill: bool,

    /// Run against an in-memory host: nothing is started or written.
    #[arg(long)]
    dry_run: bool,

    /// Page count assumed per file in --dry-run mode.
    #[arg(long, default_value_t = 3, requires = "dry_run")]
    assume_pages: usize,

    /// Output the run result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct ExportArgs {
    /// Directory containing .vsd/.vsdx files; also receives the outputs.
    dir: PathBuf,

    /// Image format for the exported pages.
    #[arg(long, value_enum, env = "VSD2DOC_FORMAT", default_value = "png")]
    format: FormatArg,

    /// Skip the pre-run kill of stale application instances.
    #[arg(long)]
    skip_kill: bool,

    /// Run against an in-memory host: nothing is started or written.
    #[arg(long)]
    dry_run: bool,

    /// Page count assumed per file in --dry-run mode.
    #[arg(long, default_value_t = 3, requires = "dry_run")]
    assume_pages: usize,

    /// Output the generated paths as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TransferArg {
    Copy,
    Export,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OutputArg {
    Merged,
    Separated,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FamilyArg {
    Word,
    Wps,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpg,
    Gif,
}

impl From<TransferArg> for TransferMode {
    fn from(v: TransferArg) -> Self {
        match v {
            TransferArg::Copy => TransferMode::Copy,
            TransferArg::Export => TransferMode::Export,
        }
    }
}

impl From<OutputArg> for OutputMode {
    fn from(v: OutputArg) -> Self {
        match v {
            OutputArg::Merged => OutputMode::Merged,
            OutputArg::Separated => OutputMode::Separated,
        }
    }
}

impl From<FamilyArg> for DocumentFamily {
    fn from(v: FamilyArg) -> Self {
        match v {
            FamilyArg::Word => DocumentFamily::Word,
            FamilyArg::Wps => DocumentFamily::Wps,
        }
    }
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Jpg => ImageFormat::Jpg,
            FormatArg::Gif => ImageFormat::Gif,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the feedback that matters; library INFO
    // logs only show up with --verbose or through RUST_LOG.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::List { dir, json } => run_list(&dir, json),
        Command::Kill { family } => run_kill(family.into(), cli.quiet),
        Command::Convert(args) => run_convert(args, cli.quiet).await,
        Command::ExportImages(args) => run_export(args, cli.quiet).await,
    }
}

fn run_list(dir: &PathBuf, json: bool) -> Result<()> {
    let files = list_sources(dir).context("Failed to list source files")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else if files.is_empty() {
        eprintln!("No Visio files found in {}", dir.display());
    } else {
        for name in &files {
            println!("{name}");
        }
    }
    Ok(())
}

fn run_kill(family: DocumentFamily, quiet: bool) -> Result<()> {
    let failures = hygiene::pre_run(family);
    if failures.is_empty() {
        if !quiet {
            eprintln!(
                "{} no stale {} or {family} instances remain",
                green("✔"),
                dim("Visio")
            );
        }
        Ok(())
    } else {
        for e in &failures {
            eprintln!("{} {e}", red("✗"));
        }
        anyhow::bail!("{} process(es) could not be terminated", failures.len());
    }
}

/// Kill stale instances unless skipped; failures are warnings, not stops.
fn best_effort_hygiene(family: DocumentFamily, skip: bool) {
    if skip {
        return;
    }
    for e in hygiene::pre_run(family) {
        eprintln!("{} {e} {}", cyan("⚠"), dim("(continuing anyway)"));
    }
}

fn enumerate(dir: &PathBuf) -> Result<Vec<String>> {
    let files = list_sources(dir).context("Failed to list source files")?;
    if files.is_empty() {
        anyhow::bail!("No Visio files (.vsd/.vsdx) found in {}", dir.display());
    }
    Ok(files)
}

async fn run_convert(args: ConvertArgs, quiet: bool) -> Result<()> {
    let family: DocumentFamily = args.family.into();
    if !args.dry_run {
        best_effort_hygiene(family, args.skip_kill);
    }

    let files = enumerate(&args.dir)?;
    let show_progress = !quiet && !args.json;

    let mut builder = ConversionRequest::builder()
        .source_dir(&args.dir)
        .files(files)
        .transfer(args.transfer.into())
        .output(args.output.into())
        .family(family)
        .app_visible(args.visible)
        .image_format(args.format.into());

    if args.dry_run {
        let factory = ScriptedFactory::new()
            .with_default_pages(args.assume_pages)
            .without_materialised_outputs();
        builder = builder.host_factory(Arc::new(factory));
    }
    if show_progress {
        builder = builder.progress(CliProgress::new());
    }

    let request = builder.build().context("Invalid conversion request")?;
    let outcome = convert(&request).await.context("Conversion failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for path in &outcome.outputs {
        writeln!(handle, "{}", path.display()).context("Failed to write to stdout")?;
    }
    if !quiet {
        eprintln!(
            "   {} pages  /  {} outputs  —  {}ms total{}",
            dim(&outcome.stats.pages.to_string()),
            dim(&outcome.stats.files.to_string()),
            outcome.stats.duration_ms,
            if args.dry_run {
                format!("  {}", cyan("(dry run — nothing written)"))
            } else {
                String::new()
            },
        );
    }
    Ok(())
}

async fn run_export(args: ExportArgs, quiet: bool) -> Result<()> {
    if !args.dry_run {
        // Only the diagram application is started by this pipeline.
        if !args.skip_kill {
            if let Err(e) = hygiene::terminate(hygiene::DIAGRAM_PROCESS) {
                eprintln!("{} {e} {}", cyan("⚠"), dim("(continuing anyway)"));
            }
        }
    }

    let files = enumerate(&args.dir)?;
    let show_progress = !quiet && !args.json;

    let mut builder = ConversionRequest::builder()
        .source_dir(&args.dir)
        .files(files)
        .image_format(args.format.into());

    if args.dry_run {
        let factory = ScriptedFactory::new()
            .with_default_pages(args.assume_pages)
            .without_materialised_outputs();
        builder = builder.host_factory(Arc::new(factory));
    }
    if show_progress {
        builder = builder.progress(CliProgress::new());
    }

    let request = builder.build().context("Invalid export request")?;
    let images = export_images(&request).await.context("Export failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&images)?);
        return Ok(());
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for path in &images {
        writeln!(handle, "{}", path.display()).context("Failed to write to stdout")?;
    }
    if !quiet {
        eprintln!(
            "   {} image(s){}",
            dim(&images.len().to_string()),
            if args.dry_run {
                format!("  {}", cyan("(dry run — nothing written)"))
            } else {
                String::new()
            },
        );
    }
    Ok(())
}
