//! Link command handler

use anyhow::{bail, Context as _, Result};

use notelink_core::links::insert_links;
use notelink_core::outline::{build_outline, flatten};
use notelink_core::{InsertPosition, LineStore, NoteId};

use super::Context;
use crate::templates::BuiltinTemplates;
use crate::output::Output;

/// Insert links to `targets` into `into`
///
/// `section` is the line index of a heading; without it the links are
/// appended to the note.
pub async fn link(
    ctx: &Context,
    into: NoteId,
    targets: &[NoteId],
    section: Option<usize>,
    position: Option<InsertPosition>,
    output: &Output,
) -> Result<()> {
    if targets.is_empty() {
        bail!("No notes to link");
    }

    let lines = ctx
        .library
        .get_lines(into)
        .await
        .with_context(|| format!("Failed to read note {}", into))?;
    let outline = build_outline(&lines);
    let section = match section {
        Some(line) => match flatten(&outline).into_iter().find(|n| n.line_index == line) {
            Some(node) => Some(node),
            None => bail!("Line {} of note {} is not a heading", line, into),
        },
        None => None,
    };

    let templates = BuiltinTemplates::new(ctx.library.clone());
    let index = insert_links(
        ctx.library.as_ref(),
        &templates,
        &ctx.config,
        into,
        targets,
        section,
        position.unwrap_or(ctx.config.insert_link_position),
    )
    .await
    .with_context(|| format!("Failed to link into note {}", into))?;

    output.success(&format!(
        "Inserted {} link(s) into note {} at line {}",
        targets.len(),
        into,
        index
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{context, lines, quiet};

    #[tokio::test]
    async fn test_link_into_section_start() {
        let ctx = context();
        let target = ctx
            .library
            .add_note_with_key("TGT1", lines(&["# Target"]))
            .await
            .unwrap();
        let note = ctx
            .library
            .add_note(lines(&["# One", "a", "# Two", "b"]))
            .await
            .unwrap();

        link(
            &ctx,
            note,
            &[target],
            Some(2),
            Some(InsertPosition::Start),
            &quiet(),
        )
        .await
        .unwrap();

        assert_eq!(
            ctx.library.get_lines(note).await.unwrap(),
            lines(&["# One", "a", "# Two", "[Target](zotero://note/1/TGT1/)", "b"])
        );
    }

    #[tokio::test]
    async fn test_link_appends_without_section() {
        let ctx = context();
        let target = ctx.library.add_note(lines(&["# T"])).await.unwrap();
        let note = ctx.library.add_note(lines(&["# N", "x"])).await.unwrap();

        link(&ctx, note, &[target], None, None, &quiet()).await.unwrap();

        let updated = ctx.library.get_lines(note).await.unwrap();
        assert_eq!(updated.len(), 3);
        assert!(updated[2].starts_with("[T](zotero://note/1/"));
    }

    #[tokio::test]
    async fn test_section_must_be_heading() {
        let ctx = context();
        let target = ctx.library.add_note(lines(&["# T"])).await.unwrap();
        let note = ctx.library.add_note(lines(&["# N", "x"])).await.unwrap();

        let err = link(&ctx, note, &[target], Some(1), None, &quiet())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a heading"));
    }
}
