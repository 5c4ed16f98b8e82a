//! Host glue consumed by the exporter
//!
//! Destination pickers, note viewers and user notifications belong to the
//! application embedding the core.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::models::NoteId;

/// File type offered in a save dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub name: &'static str,
    pub pattern: &'static str,
}

impl FileFilter {
    pub const MARKDOWN: FileFilter = FileFilter {
        name: "Markdown File (*.md)",
        pattern: "*.md",
    };
    pub const DOCX: FileFilter = FileFilter {
        name: "MS Word Document (*.docx)",
        pattern: "*.docx",
    };
    pub const PDF: FileFilter = FileFilter {
        name: "PDF Document (*.pdf)",
        pattern: "*.pdf",
    };
    pub const FREEMIND: FileFilter = FileFilter {
        name: "FreeMind (*.mm)",
        pattern: "*.mm",
    };
}

#[async_trait]
pub trait ExportHost: Send + Sync {
    /// Ask for a file to save to. `None` when the user cancels.
    async fn pick_file(
        &self,
        title: &str,
        suggested_name: &str,
        filter: &FileFilter,
    ) -> Option<PathBuf>;

    /// Ask for a destination directory. `None` when the user cancels.
    async fn pick_directory(&self, title: &str) -> Option<PathBuf>;

    /// Show a note; renderers may need it open
    async fn open_viewer(&self, _note: NoteId) {}

    async fn close_viewer(&self, _note: NoteId) {}

    /// Short user-facing message, e.g. where a file was saved
    fn notify(&self, _message: &str) {}
}
