//! Export option record

use serde::{Deserialize, Serialize};

/// Every flag recognised by [`crate::export::Exporter::export_note`]
///
/// Flags fall in two groups. Action flags each request an output;
/// `highlights_only` and `convert_square_brackets` only shape Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Inline linked notes into the exported document
    pub embed_link: bool,
    /// Keep the resolved copy as a new note
    pub export_note: bool,
    /// Write a Markdown file
    pub export_markdown: bool,
    /// Write the note and every linked note as separate Markdown files
    pub export_sub_markdown: bool,
    /// Register the separate Markdown files for sync
    pub auto_sync: bool,
    /// Keep only headings and highlighted lines. Not an action: set alone,
    /// nothing is exported.
    pub highlights_only: bool,
    pub convert_square_brackets: bool,
    pub export_word_doc: bool,
    pub export_pdf: bool,
    /// Write a FreeMind mind map of the outline
    pub export_mindmap: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            embed_link: true,
            export_note: false,
            export_markdown: true,
            export_sub_markdown: false,
            auto_sync: false,
            highlights_only: false,
            convert_square_brackets: false,
            export_word_doc: false,
            export_pdf: false,
            export_mindmap: false,
        }
    }
}

impl ExportOptions {
    /// All flags off
    pub fn none() -> Self {
        Self {
            embed_link: false,
            export_markdown: false,
            ..Self::default()
        }
    }

    /// Whether at least one output is requested
    pub fn has_action(&self) -> bool {
        self.export_note
            || self.export_markdown
            || self.export_sub_markdown
            || self.auto_sync
            || self.export_word_doc
            || self.export_pdf
            || self.export_mindmap
    }

    /// Whether the note is copied into a temporary note before export
    pub fn needs_copy(&self) -> bool {
        self.embed_link || self.export_note
    }

    /// Whether the linked notes are exported as separate files
    pub fn wants_batch(&self) -> bool {
        self.export_sub_markdown || self.auto_sync
    }
}
