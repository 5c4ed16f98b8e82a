//! Import command handler

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use tracing::warn;

use notelink_core::format::{looks_like_markdown, parse_markdown};

use super::Context;
use crate::output::Output;

/// Create a note from a Markdown file, one line per top-level block
pub async fn import(ctx: &Context, file: &Path, output: &Output) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {:?}", file))?;

    if !looks_like_markdown(&text) {
        warn!("{:?} does not look like Markdown, importing it as plain text", file);
    }

    let lines = parse_markdown(&text);
    if lines.is_empty() {
        bail!("Nothing to import from {:?}", file);
    }

    let note = ctx
        .library
        .add_note(lines)
        .await
        .context("Failed to create note")?;

    if output.is_quiet() {
        println!("{}", note);
    } else {
        output.success(&format!("Imported {:?} as note {}", file, note));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{context, lines, quiet};
    use notelink_core::LineStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_import_splits_blocks() {
        let ctx = context();
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("draft.md");
        std::fs::write(&file, "# Draft\n\nFirst paragraph\nstill first\n\n- item\n").unwrap();

        import(&ctx, &file, &quiet()).await.unwrap();

        let summary = &ctx.library.list().await[0];
        assert_eq!(summary.title, "Draft");
        assert_eq!(
            ctx.library.get_lines(summary.id).await.unwrap(),
            lines(&["# Draft", "First paragraph\nstill first", "- item"])
        );
    }

    #[tokio::test]
    async fn test_empty_file_is_rejected() {
        let ctx = context();
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("empty.md");
        std::fs::write(&file, "\n\n").unwrap();

        assert!(import(&ctx, &file, &quiet()).await.is_err());
        assert!(ctx.library.is_empty().await);
    }
}
