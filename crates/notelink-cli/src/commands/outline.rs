//! Outline command handler

use anyhow::{Context as _, Result};

use notelink_core::outline::{build_outline, title_from_lines};
use notelink_core::{LineStore, NoteId};

use super::Context;
use crate::output::Output;

/// Show the heading tree of a note
pub async fn show(ctx: &Context, note: NoteId, output: &Output) -> Result<()> {
    let lines = ctx
        .library
        .get_lines(note)
        .await
        .with_context(|| format!("Failed to read note {}", note))?;

    output.print_outline(&title_from_lines(&lines), &build_outline(&lines));
    Ok(())
}
