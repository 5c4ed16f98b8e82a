//! Export filenames
//!
//! Filenames come from the configured template with the note as the only
//! argument. A template failure never aborts an export: the name falls back
//! to the note title, then to `note-<id>`.

use tracing::warn;

use super::error::ExportError;
use crate::models::NoteId;
use crate::store::LineStore;
use crate::template::{RenderOptions, TemplateRenderer, TemplateValue};

/// Argument names passed to the filename template
pub const FILENAME_TEMPLATE_ARGS: [&str; 1] = ["noteItem"];

const MAX_STEM_CHARS: usize = 200;

/// Replace path-hostile characters
///
/// Backslashes become `-`; separators, reserved punctuation and control
/// characters become `_`. Returns `None` when nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let cleaned: String = name
        .replace('\\', "-")
        .chars()
        .map(|c| match c {
            '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim().trim_end_matches('.').trim_start_matches('.').trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_' || c == '-') {
        return None;
    }
    Some(trimmed.to_string())
}

/// Append `.ext` unless the name already carries it, capping the stem length
pub fn with_extension(name: &str, ext: &str) -> String {
    let suffix = format!(".{}", ext);
    let stem = if name.to_ascii_lowercase().ends_with(&suffix) {
        &name[..name.len() - suffix.len()]
    } else {
        name
    };
    let stem: String = stem.chars().take(MAX_STEM_CHARS).collect();
    format!("{}{}", stem.trim_end(), suffix)
}

/// Name suggested in save dialogs, `<title>.<ext>`
pub fn suggested_name(title: &str, note: NoteId, ext: &str) -> String {
    let stem = sanitize_filename(title).unwrap_or_else(|| format!("note-{}", note));
    with_extension(&stem, ext)
}

/// Render the Markdown export filename of a note
pub async fn export_filename(
    store: &dyn LineStore,
    renderer: &dyn TemplateRenderer,
    template: &str,
    note: NoteId,
) -> String {
    let rendered = renderer
        .render(
            template,
            &FILENAME_TEMPLATE_ARGS,
            &[TemplateValue::Note(note)],
            RenderOptions::default(),
        )
        .await
        .map_err(|e| ExportError::Naming {
            template: template.to_string(),
            details: e.to_string(),
        });

    match rendered.map(|name| sanitize_filename(&name)) {
        Ok(Some(name)) => with_extension(&name, "md"),
        Ok(None) => {
            warn!("Filename template {} rendered nothing for note {}", template, note);
            fallback_name(store, note).await
        }
        Err(e) => {
            warn!("{}; using fallback name for note {}", e, note);
            fallback_name(store, note).await
        }
    }
}

async fn fallback_name(store: &dyn LineStore, note: NoteId) -> String {
    let title = store.note_title(note).await.unwrap_or_default();
    suggested_name(&title, note, "md")
}
