//! Sync command handlers

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use notelink_core::NoteId;

use super::export::finish;
use super::Context;
use crate::output::Output;

/// Re-export notes to their recorded destinations
///
/// Without ids every synced note is re-exported. Unsynced notes are
/// exported into `dir` and become synced.
pub async fn sync(
    ctx: &Context,
    notes: Vec<NoteId>,
    dir: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let notes = if notes.is_empty() {
        ctx.registry
            .records()
            .into_iter()
            .map(|record| record.note_id)
            .collect()
    } else {
        notes
    };

    if notes.is_empty() {
        output.message("No synced notes. Sync a note first with: notelink sync <id> --dir <dir>");
        return Ok(());
    }

    let report = ctx
        .exporter(dir)
        .sync_notes(&notes)
        .await
        .context("Sync failed")?;

    finish(report, output)
}

/// Stop syncing a note
pub async fn unsync(ctx: &Context, note: NoteId, output: &Output) -> Result<()> {
    if ctx.exporter(None).unsync(note).await? {
        output.success(&format!("Note {} is no longer synced", note));
    } else {
        output.message(&format!("Note {} was not synced", note));
    }
    Ok(())
}
