//! End-to-end pipeline tests against the scripted automation host.
//!
//! Every test builds a request over a temp directory, runs the real
//! orchestrator, then asserts on the saved block lists, the filesystem, and
//! the host action log.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use vsd2doc::host::scripted::{read_blocks, Action, Block, ScriptedFactory};
use vsd2doc::host::HostFactory;
use vsd2doc::{
    convert, export_images, list_sources, ConversionProgress, ConversionRequest, ConvertError,
    DocumentFamily, OutputMode, ProgressEvent, TransferMode, MERGED_OUTPUT, OUTPUT_SUBDIR,
};

fn page(file: &str, page: usize) -> Block {
    Block::Page {
        file: file.to_string(),
        page,
    }
}

/// A two-file fixture: a.vsdx with 2 pages, b.vsd with 1.
fn two_file_factory() -> Arc<ScriptedFactory> {
    Arc::new(
        ScriptedFactory::new()
            .with_pages("a.vsdx", 2)
            .with_pages("b.vsd", 1),
    )
}

fn two_file_request(
    dir: &Path,
    factory: Arc<ScriptedFactory>,
) -> vsd2doc::ConversionRequestBuilder {
    ConversionRequest::builder()
        .source_dir(dir)
        .files(vec!["a.vsdx".into(), "b.vsd".into()])
        .host_factory(factory as Arc<dyn HostFactory>)
}

#[tokio::test]
async fn merged_copy_run_produces_one_document_with_boundary_breaks() {
    let dir = TempDir::new().unwrap();
    let factory = two_file_factory();
    let request = two_file_request(dir.path(), Arc::clone(&factory))
        .build()
        .unwrap();

    let outcome = convert(&request).await.unwrap();

    let out = dir.path().join(MERGED_OUTPUT);
    assert_eq!(outcome.outputs, vec![out.clone()]);
    assert_eq!(outcome.stats.files, 2);
    assert_eq!(outcome.stats.pages, 3);

    // Pages in file order, a break after every page except the last of the
    // run; the break between a.vsdx and b.vsd separates the two files.
    assert_eq!(
        read_blocks(&out).unwrap(),
        vec![
            page("a.vsdx", 1),
            Block::PageBreak,
            page("a.vsdx", 2),
            Block::PageBreak,
            page("b.vsd", 1),
        ]
    );

    // Sources open and close strictly one at a time, the save happens before
    // either application quits, and the document application quits first.
    assert_eq!(
        factory.actions(),
        vec![
            Action::DiagramStarted,
            Action::DocumentStarted {
                prog_id: "Word.Application".into()
            },
            Action::SourceOpened {
                file: "a.vsdx".into()
            },
            Action::SourceClosed {
                file: "a.vsdx".into()
            },
            Action::SourceOpened {
                file: "b.vsd".into()
            },
            Action::SourceClosed {
                file: "b.vsd".into()
            },
            Action::Saved { path: out },
            Action::DocumentQuit,
            Action::DiagramQuit,
        ]
    );
}

#[tokio::test]
async fn separated_run_writes_one_document_per_source() {
    let dir = TempDir::new().unwrap();
    let factory = two_file_factory();
    let request = two_file_request(dir.path(), Arc::clone(&factory))
        .output(OutputMode::Separated)
        .build()
        .unwrap();

    let outcome = convert(&request).await.unwrap();

    let out_a = dir.path().join(OUTPUT_SUBDIR).join("a.docx");
    let out_b = dir.path().join(OUTPUT_SUBDIR).join("b.docx");
    assert_eq!(outcome.outputs, vec![out_a.clone(), out_b.clone()]);

    // Each document ends without a trailing break.
    assert_eq!(
        read_blocks(&out_a).unwrap(),
        vec![page("a.vsdx", 1), Block::PageBreak, page("a.vsdx", 2)]
    );
    assert_eq!(read_blocks(&out_b).unwrap(), vec![page("b.vsd", 1)]);
}

#[tokio::test]
async fn export_transfer_inserts_images_and_leaves_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let factory = two_file_factory();
    let request = two_file_request(dir.path(), Arc::clone(&factory))
        .transfer(TransferMode::Export)
        .output(OutputMode::Separated)
        .build()
        .unwrap();

    convert(&request).await.unwrap();

    assert_eq!(
        read_blocks(&dir.path().join(OUTPUT_SUBDIR).join("a.docx")).unwrap(),
        vec![
            Block::Image {
                name: "temp_a.vsdx_1.png".into()
            },
            Block::PageBreak,
            Block::Image {
                name: "temp_a.vsdx_2.png".into()
            },
        ]
    );

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("temp_"))
        .collect();
    assert!(leftovers.is_empty(), "temp images left behind: {leftovers:?}");
}

#[tokio::test]
async fn page_failure_aborts_after_cleanup_and_teardown() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(
        ScriptedFactory::new()
            .with_pages("a.vsdx", 2)
            .with_pages("b.vsd", 1)
            .with_failing_insert_containing("temp_a.vsdx_2"),
    );
    let request = two_file_request(dir.path(), Arc::clone(&factory))
        .transfer(TransferMode::Export)
        .build()
        .unwrap();

    let err = convert(&request).await.unwrap_err();
    match err {
        ConvertError::Transfer { file, page, .. } => {
            assert_eq!(file, "a.vsdx");
            assert_eq!(page, 2);
        }
        other => panic!("expected Transfer, got {other}"),
    }

    // The failing page's temp image is gone and b.vsd was never reached.
    assert!(!dir.path().join("temp_a.vsdx_2.png").exists());
    let actions = factory.actions();
    assert!(!actions.contains(&Action::SourceOpened {
        file: "b.vsd".into()
    }));
    assert!(!actions
        .iter()
        .any(|a| matches!(a, Action::Saved { .. })));

    // The failing source is still closed, then both applications quit.
    let tail = &actions[actions.len() - 3..];
    assert_eq!(
        tail,
        [
            Action::SourceClosed {
                file: "a.vsdx".into()
            },
            Action::DocumentQuit,
            Action::DiagramQuit,
        ]
    );
}

#[tokio::test]
async fn wps_falls_back_to_the_second_program_identity() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(
        ScriptedFactory::new().with_failing_prog_id("Kwps.Application"),
    );
    let request = ConversionRequest::builder()
        .source_dir(dir.path())
        .file("a.vsdx")
        .family(DocumentFamily::Wps)
        .host_factory(Arc::clone(&factory) as Arc<dyn HostFactory>)
        .build()
        .unwrap();

    convert(&request).await.unwrap();
    assert_eq!(factory.prog_ids_started(), vec!["Wps.Application"]);
}

#[tokio::test]
async fn no_compatible_application_still_quits_the_diagram_app() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(
        ScriptedFactory::new()
            .with_failing_prog_id("Kwps.Application")
            .with_failing_prog_id("Wps.Application"),
    );
    let request = ConversionRequest::builder()
        .source_dir(dir.path())
        .file("a.vsdx")
        .family(DocumentFamily::Wps)
        .host_factory(Arc::clone(&factory) as Arc<dyn HostFactory>)
        .build()
        .unwrap();

    let err = convert(&request).await.unwrap_err();
    match err {
        ConvertError::NoCompatibleApplication { family, tried } => {
            assert_eq!(family, DocumentFamily::Wps);
            assert_eq!(tried, vec!["Kwps.Application", "Wps.Application"]);
        }
        other => panic!("expected NoCompatibleApplication, got {other}"),
    }

    // The diagram application started first and is released again; no
    // document application ever came up.
    assert_eq!(
        factory.actions(),
        vec![Action::DiagramStarted, Action::DiagramQuit]
    );
}

#[tokio::test]
async fn open_failure_aborts_without_saving_anything() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(
        ScriptedFactory::new()
            .with_pages("a.vsdx", 2)
            .with_failing_open("b.vsd"),
    );
    let request = two_file_request(dir.path(), Arc::clone(&factory))
        .build()
        .unwrap();

    let err = convert(&request).await.unwrap_err();
    assert!(matches!(err, ConvertError::AutomationUnavailable { .. }));

    let actions = factory.actions();
    assert!(!actions.iter().any(|a| matches!(a, Action::Saved { .. })));
    assert!(!dir.path().join(MERGED_OUTPUT).exists());
    let tail = &actions[actions.len() - 2..];
    assert_eq!(tail, [Action::DocumentQuit, Action::DiagramQuit]);
}

#[tokio::test]
async fn image_export_writes_pages_into_per_file_directories() {
    let dir = TempDir::new().unwrap();
    let factory = two_file_factory();
    let request = two_file_request(dir.path(), Arc::clone(&factory))
        .build()
        .unwrap();

    let images = export_images(&request).await.unwrap();

    let base = dir.path().join(OUTPUT_SUBDIR);
    assert_eq!(
        images,
        vec![
            base.join("a").join("Page_1.png"),
            base.join("a").join("Page_2.png"),
            base.join("b").join("Page_1.png"),
        ]
    );
    for image in &images {
        assert!(image.exists(), "missing exported image {}", image.display());
    }
}

#[tokio::test]
async fn image_export_failure_surfaces_and_keeps_earlier_images() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(
        ScriptedFactory::new()
            .with_pages("a.vsdx", 2)
            .with_pages("b.vsd", 1)
            .with_failing_export("b.vsd", 1),
    );
    let request = two_file_request(dir.path(), Arc::clone(&factory))
        .build()
        .unwrap();

    let err = export_images(&request).await.unwrap_err();
    assert!(matches!(err, ConvertError::AutomationUnavailable { .. }));

    // Work done before the failure stays on disk, and the diagram
    // application is still released.
    let base = dir.path().join(OUTPUT_SUBDIR);
    assert!(base.join("a").join("Page_2.png").exists());
    assert_eq!(factory.actions().last(), Some(&Action::DiagramQuit));
}

/// Records every callback invocation for ordering assertions.
#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl ConversionProgress for RecordingProgress {
    fn on_run_start(&self, total_files: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("start:{total_files}"));
    }

    fn on_file_start(&self, event: &ProgressEvent) {
        self.events
            .lock()
            .unwrap()
            .push(format!("file:{}:{}/{}", event.file_name, event.index, event.total));
    }

    fn on_run_complete(&self, total_files: usize, outputs: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete:{total_files}:{outputs}"));
    }
}

#[tokio::test]
async fn progress_events_arrive_in_file_order() {
    let dir = TempDir::new().unwrap();
    let progress = Arc::new(RecordingProgress::default());
    let request = two_file_request(dir.path(), two_file_factory())
        .progress(Arc::clone(&progress) as Arc<dyn ConversionProgress>)
        .build()
        .unwrap();

    convert(&request).await.unwrap();

    assert_eq!(
        *progress.events.lock().unwrap(),
        vec![
            "start:2".to_string(),
            "file:a.vsdx:1/2".to_string(),
            "file:b.vsd:2/2".to_string(),
            "complete:2:1".to_string(),
        ]
    );
}

#[test]
fn empty_directory_yields_no_request_at_all() {
    let dir = TempDir::new().unwrap();
    let files = list_sources(dir.path()).unwrap();
    assert!(files.is_empty());

    let err = ConversionRequest::builder()
        .source_dir(dir.path())
        .files(files)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConvertError::NoSourceFiles { .. }));
}

#[test]
fn listing_is_sorted_and_extension_filtered() {
    let dir = TempDir::new().unwrap();
    for name in ["Zeta.VSDX", "alpha.vsd", "notes.txt", "beta.vsdx"] {
        fs::write(dir.path().join(name), b"stub").unwrap();
    }

    let files = list_sources(dir.path()).unwrap();
    assert_eq!(files, vec!["Zeta.VSDX", "alpha.vsd", "beta.vsdx"]);
}
