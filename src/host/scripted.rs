//! A deterministic in-memory automation host.
//!
//! [`ScriptedFactory`] stands in for the live applications: the diagram side
//! serves scripted page counts and writes stub image files, the document side
//! records inserted content as an ordered block list and saves it as JSON.
//! Every acquisition, open, close, save, and quit is appended to a shared
//! action log so tests can assert teardown ordering.
//!
//! This backs the integration tests and the CLI `--dry-run` mode. It is
//! deliberately strict where the real applications are strict: copying
//! without an active page, pasting an empty clipboard, or inserting an image
//! file that does not exist are all errors, because the orchestrator must
//! never reach those states.

use crate::config::ImageFormat;
use crate::error::ConvertError;
use crate::host::{CursorId, DestDocId, DiagramHost, DocumentHost, HostFactory, SourceDocId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One piece of content in a scripted destination document, in insertion
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    /// A page pasted from the clipboard: the source file and 1-based page.
    Page { file: String, page: usize },
    /// An inserted image, identified by its file name.
    Image { name: String },
    /// A page break.
    PageBreak,
}

/// One observable host interaction, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    DiagramStarted,
    DocumentStarted { prog_id: String },
    SourceOpened { file: String },
    SourceClosed { file: String },
    Saved { path: PathBuf },
    DocumentQuit,
    DiagramQuit,
}

/// Knobs controlling the scripted behaviour. Cloned into each host.
#[derive(Debug, Clone)]
struct Script {
    default_pages: usize,
    pages: HashMap<String, usize>,
    /// When false, nothing touches the filesystem: exports and saves are
    /// logged only. Used by the CLI dry-run.
    materialise: bool,
    fail_diagram_start: bool,
    failing_prog_ids: HashSet<String>,
    failing_opens: HashSet<String>,
    failing_exports: HashSet<(String, usize)>,
    fail_paste_at: Option<usize>,
    fail_insert_containing: Option<String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            default_pages: 1,
            pages: HashMap::new(),
            materialise: true,
            fail_diagram_start: false,
            failing_prog_ids: HashSet::new(),
            failing_opens: HashSet::new(),
            failing_exports: HashSet::new(),
            fail_paste_at: None,
            fail_insert_containing: None,
        }
    }
}

/// In-memory [`HostFactory`] with scripted page counts and failure injection.
#[derive(Default)]
pub struct ScriptedFactory {
    script: Script,
    clipboard: Arc<Mutex<Option<(String, usize)>>>,
    log: Arc<Mutex<Vec<Action>>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page count for files without an explicit entry. Default: 1.
    pub fn with_default_pages(mut self, pages: usize) -> Self {
        self.script.default_pages = pages;
        self
    }

    /// Page count for one specific file name.
    pub fn with_pages(mut self, file: impl Into<String>, pages: usize) -> Self {
        self.script.pages.insert(file.into(), pages);
        self
    }

    /// Log exports and saves without writing any file. For dry runs.
    pub fn without_materialised_outputs(mut self) -> Self {
        self.script.materialise = false;
        self
    }

    /// Make the diagram application refuse to start.
    pub fn with_failing_diagram_start(mut self) -> Self {
        self.script.fail_diagram_start = true;
        self
    }

    /// Make one document-application program identity refuse to start.
    pub fn with_failing_prog_id(mut self, prog_id: impl Into<String>) -> Self {
        self.script.failing_prog_ids.insert(prog_id.into());
        self
    }

    /// Make opening one source file fail.
    pub fn with_failing_open(mut self, file: impl Into<String>) -> Self {
        self.script.failing_opens.insert(file.into());
        self
    }

    /// Make exporting one page of one file fail.
    pub fn with_failing_export(mut self, file: impl Into<String>, page: usize) -> Self {
        self.script.failing_exports.insert((file.into(), page));
        self
    }

    /// Make the n-th paste of the run fail (1-based).
    pub fn with_failing_paste_at(mut self, nth: usize) -> Self {
        self.script.fail_paste_at = Some(nth);
        self
    }

    /// Make image insertion fail for any path containing `fragment`.
    pub fn with_failing_insert_containing(mut self, fragment: impl Into<String>) -> Self {
        self.script.fail_insert_containing = Some(fragment.into());
        self
    }

    /// Snapshot of the action log, in call order.
    pub fn actions(&self) -> Vec<Action> {
        self.log.lock().unwrap().clone()
    }

    /// The program identities that actually started, in start order.
    pub fn prog_ids_started(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::DocumentStarted { prog_id } => Some(prog_id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, action: Action) {
        self.log.lock().unwrap().push(action);
    }
}

impl HostFactory for ScriptedFactory {
    fn open_diagram_host(&self) -> Result<Box<dyn DiagramHost>, ConvertError> {
        if self.script.fail_diagram_start {
            return Err(ConvertError::AutomationUnavailable {
                call: "Visio.Application",
                detail: "scripted refusal to start".into(),
            });
        }
        self.record(Action::DiagramStarted);
        Ok(Box::new(ScriptedDiagram {
            script: self.script.clone(),
            log: Arc::clone(&self.log),
            clipboard: Arc::clone(&self.clipboard),
            next_id: 1,
            open: HashMap::new(),
            active: None,
        }))
    }

    fn open_document_host(
        &self,
        prog_id: &str,
        _visible: bool,
    ) -> Result<Box<dyn DocumentHost>, ConvertError> {
        if self.script.failing_prog_ids.contains(prog_id) {
            return Err(ConvertError::AutomationUnavailable {
                call: "Dispatch",
                detail: format!("scripted refusal to start '{prog_id}'"),
            });
        }
        self.record(Action::DocumentStarted {
            prog_id: prog_id.to_string(),
        });
        Ok(Box::new(ScriptedDocument {
            script: self.script.clone(),
            log: Arc::clone(&self.log),
            clipboard: Arc::clone(&self.clipboard),
            next_id: 1,
            docs: HashMap::new(),
            cursors: HashMap::new(),
            pastes: 0,
        }))
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ── Diagram side ─────────────────────────────────────────────────────────

struct ScriptedDiagram {
    script: Script,
    log: Arc<Mutex<Vec<Action>>>,
    clipboard: Arc<Mutex<Option<(String, usize)>>>,
    next_id: u64,
    open: HashMap<u64, String>,
    active: Option<(SourceDocId, usize)>,
}

impl ScriptedDiagram {
    fn record(&self, action: Action) {
        self.log.lock().unwrap().push(action);
    }

    fn file_of(&self, doc: SourceDocId) -> Result<String, ConvertError> {
        self.open
            .get(&doc.0)
            .cloned()
            .ok_or(ConvertError::AutomationUnavailable {
                call: "Documents.Item",
                detail: "no such open document".into(),
            })
    }

    fn pages_of(&self, file: &str) -> usize {
        self.script
            .pages
            .get(file)
            .copied()
            .unwrap_or(self.script.default_pages)
    }
}

impl DiagramHost for ScriptedDiagram {
    fn open_document(&mut self, path: &Path) -> Result<SourceDocId, ConvertError> {
        let file = file_name_of(path);
        if self.script.failing_opens.contains(&file) {
            return Err(ConvertError::AutomationUnavailable {
                call: "Documents.Open",
                detail: format!("scripted open failure for '{file}'"),
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.open.insert(id, file.clone());
        self.record(Action::SourceOpened { file });
        Ok(SourceDocId(id))
    }

    fn page_count(&mut self, doc: SourceDocId) -> Result<usize, ConvertError> {
        let file = self.file_of(doc)?;
        Ok(self.pages_of(&file))
    }

    fn activate_page(&mut self, doc: SourceDocId, page: usize) -> Result<(), ConvertError> {
        let file = self.file_of(doc)?;
        let count = self.pages_of(&file);
        if page == 0 || page > count {
            return Err(ConvertError::AutomationUnavailable {
                call: "ActiveWindow.Page",
                detail: format!("page {page} out of range for '{file}' ({count} pages)"),
            });
        }
        self.active = Some((doc, page));
        Ok(())
    }

    fn copy_active_page(&mut self) -> Result<(), ConvertError> {
        let (doc, page) = self.active.ok_or(ConvertError::AutomationUnavailable {
            call: "Selection.Copy",
            detail: "no active page".into(),
        })?;
        let file = self.file_of(doc)?;
        *self.clipboard.lock().unwrap() = Some((file, page));
        Ok(())
    }

    fn export_page(
        &mut self,
        doc: SourceDocId,
        page: usize,
        path: &Path,
        _format: ImageFormat,
    ) -> Result<(), ConvertError> {
        let file = self.file_of(doc)?;
        if self.script.failing_exports.contains(&(file.clone(), page)) {
            return Err(ConvertError::AutomationUnavailable {
                call: "Page.Export",
                detail: format!("scripted export failure for '{file}' page {page}"),
            });
        }
        if self.script.materialise {
            let stub = format!("scripted raster of {file} page {page}\n");
            std::fs::write(path, stub).map_err(|e| ConvertError::AutomationUnavailable {
                call: "Page.Export",
                detail: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn close_document(&mut self, doc: SourceDocId) -> Result<(), ConvertError> {
        let file = self
            .open
            .remove(&doc.0)
            .ok_or(ConvertError::AutomationUnavailable {
                call: "Document.Close",
                detail: "no such open document".into(),
            })?;
        if self.active.map(|(d, _)| d) == Some(doc) {
            self.active = None;
        }
        self.record(Action::SourceClosed { file });
        Ok(())
    }

    fn quit(&mut self) -> Result<(), ConvertError> {
        self.record(Action::DiagramQuit);
        Ok(())
    }
}

// ── Document side ────────────────────────────────────────────────────────

struct ScriptedDocument {
    script: Script,
    log: Arc<Mutex<Vec<Action>>>,
    clipboard: Arc<Mutex<Option<(String, usize)>>>,
    next_id: u64,
    docs: HashMap<u64, Vec<Block>>,
    cursors: HashMap<u64, u64>,
    pastes: usize,
}

impl ScriptedDocument {
    fn record(&self, action: Action) {
        self.log.lock().unwrap().push(action);
    }

    fn doc_of_cursor(&self, cursor: CursorId) -> Result<u64, ConvertError> {
        self.cursors
            .get(&cursor.0)
            .copied()
            .ok_or(ConvertError::AutomationUnavailable {
                call: "Range",
                detail: "cursor does not belong to an open document".into(),
            })
    }

    fn push(&mut self, cursor: CursorId, block: Block) -> Result<(), ConvertError> {
        let doc = self.doc_of_cursor(cursor)?;
        self.docs
            .get_mut(&doc)
            .ok_or(ConvertError::AutomationUnavailable {
                call: "Range",
                detail: "document closed".into(),
            })?
            .push(block);
        Ok(())
    }
}

impl DocumentHost for ScriptedDocument {
    fn new_document(&mut self) -> Result<DestDocId, ConvertError> {
        let id = self.next_id;
        self.next_id += 1;
        self.docs.insert(id, Vec::new());
        Ok(DestDocId(id))
    }

    fn end_of_content(&mut self, doc: DestDocId) -> Result<CursorId, ConvertError> {
        if !self.docs.contains_key(&doc.0) {
            return Err(ConvertError::AutomationUnavailable {
                call: "Content.Collapse",
                detail: "no such document".into(),
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.cursors.insert(id, doc.0);
        Ok(CursorId(id))
    }

    fn paste(&mut self, cursor: CursorId) -> Result<(), ConvertError> {
        self.pastes += 1;
        if self.script.fail_paste_at == Some(self.pastes) {
            return Err(ConvertError::AutomationUnavailable {
                call: "Range.Paste",
                detail: format!("scripted paste failure (paste #{})", self.pastes),
            });
        }
        let content = self.clipboard.lock().unwrap().clone();
        let (file, page) = content.ok_or(ConvertError::AutomationUnavailable {
            call: "Range.Paste",
            detail: "clipboard is empty".into(),
        })?;
        self.push(cursor, Block::Page { file, page })
    }

    fn insert_image(&mut self, cursor: CursorId, image: &Path) -> Result<(), ConvertError> {
        let name = file_name_of(image);
        if let Some(ref fragment) = self.script.fail_insert_containing {
            if name.contains(fragment.as_str()) {
                return Err(ConvertError::AutomationUnavailable {
                    call: "InlineShapes.AddPicture",
                    detail: format!("scripted insert failure for '{name}'"),
                });
            }
        }
        if self.script.materialise && !image.exists() {
            return Err(ConvertError::AutomationUnavailable {
                call: "InlineShapes.AddPicture",
                detail: format!("image file not found: {}", image.display()),
            });
        }
        self.push(cursor, Block::Image { name })
    }

    fn insert_page_break(&mut self, cursor: CursorId) -> Result<(), ConvertError> {
        self.push(cursor, Block::PageBreak)
    }

    fn save_as(&mut self, doc: DestDocId, path: &Path) -> Result<(), ConvertError> {
        let blocks = self
            .docs
            .get(&doc.0)
            .ok_or(ConvertError::AutomationUnavailable {
                call: "Document.SaveAs",
                detail: "no such document".into(),
            })?;
        if self.script.materialise {
            let json = serde_json::to_string_pretty(blocks).map_err(|e| {
                ConvertError::AutomationUnavailable {
                    call: "Document.SaveAs",
                    detail: e.to_string(),
                }
            })?;
            std::fs::write(path, json).map_err(|e| ConvertError::AutomationUnavailable {
                call: "Document.SaveAs",
                detail: e.to_string(),
            })?;
        }
        self.record(Action::Saved {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn close_document(&mut self, doc: DestDocId) -> Result<(), ConvertError> {
        if self.docs.remove(&doc.0).is_none() {
            return Err(ConvertError::AutomationUnavailable {
                call: "Document.Close",
                detail: "no such document".into(),
            });
        }
        self.cursors.retain(|_, d| *d != doc.0);
        Ok(())
    }

    fn quit(&mut self) -> Result<(), ConvertError> {
        self.record(Action::DocumentQuit);
        Ok(())
    }
}

/// Read the block list a scripted destination document was saved as.
pub fn read_blocks(path: &Path) -> std::io::Result<Vec<Block>> {
    let json = std::fs::read_to_string(path)?;
    serde_json::from_str(&json)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
