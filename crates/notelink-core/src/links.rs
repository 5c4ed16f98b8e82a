//! Link insertion
//!
//! Writes forward links to one or more target notes into a note, either
//! inside a chosen outline section or after the last line.

use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{InsertPosition, Line, NoteId, OutlineNode};
use crate::outline::insertion_index;
use crate::store::{LineStore, StoreError};
use crate::template::{RenderOptions, TemplateError, TemplateRenderer, TemplateValue};

/// Argument names passed to the link template
pub const LINK_TEMPLATE_ARGS: [&str; 4] = ["link", "linkText", "subNoteItem", "noteItem"];

#[derive(Error, Debug)]
pub enum LinkError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to render link: {0}")]
    Template(#[from] TemplateError),
}

/// Render the link lines for `targets` as they would be inserted into `current`
pub async fn render_links(
    store: &dyn LineStore,
    renderer: &dyn TemplateRenderer,
    config: &Config,
    current: NoteId,
    targets: &[NoteId],
) -> Result<Vec<Line>, LinkError> {
    let mut rendered = Vec::with_capacity(targets.len());

    for &target in targets {
        let link = store.note_key(target).await?.to_uri(&config.link_scheme);
        let title = store.note_title(target).await?;
        let link_text = match title.trim() {
            "" => link.clone(),
            trimmed => trimmed.to_string(),
        };

        let line = renderer
            .render(
                &config.link_template,
                &LINK_TEMPLATE_ARGS,
                &[
                    TemplateValue::Text(link),
                    TemplateValue::Text(link_text),
                    TemplateValue::Note(target),
                    TemplateValue::Note(current),
                ],
                RenderOptions { dry_run: true },
            )
            .await?;
        rendered.push(line.trim_end_matches('\n').to_string());
    }

    Ok(rendered)
}

/// Insert links to `targets` into `current`
///
/// Without a section the links are appended after the last line. Returns
/// the line index of the first inserted link.
pub async fn insert_links(
    store: &dyn LineStore,
    renderer: &dyn TemplateRenderer,
    config: &Config,
    current: NoteId,
    targets: &[NoteId],
    section: Option<&OutlineNode>,
    position: InsertPosition,
) -> Result<usize, LinkError> {
    let mut lines = store.get_lines(current).await?;
    let rendered = render_links(store, renderer, config, current, targets).await?;

    // A section from a stale outline must not point past the end
    let index = insertion_index(section, position, lines.len()).min(lines.len());
    debug!(
        "Inserting {} link(s) into note {} at line {} ({})",
        rendered.len(),
        current,
        index,
        position.as_str()
    );

    lines.splice(index..index, rendered);
    store.set_lines(current, lines).await?;

    info!("Linked {} note(s) into note {}", targets.len(), current);
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::build_outline;
    use crate::store::Library;
    use crate::template::argument;
    use async_trait::async_trait;

    /// Renders `[linkText](link)` and checks the dry-run flag
    struct MarkdownLinks;

    #[async_trait]
    impl TemplateRenderer for MarkdownLinks {
        async fn render(
            &self,
            template_id: &str,
            names: &[&str],
            arguments: &[TemplateValue],
            options: RenderOptions,
        ) -> Result<String, TemplateError> {
            assert!(options.dry_run);
            let text = |name: &str| {
                argument(names, arguments, name)
                    .and_then(|v| v.as_text())
                    .map(str::to_string)
                    .ok_or_else(|| TemplateError::MissingArgument {
                        template: template_id.to_string(),
                        argument: name.to_string(),
                    })
            };
            Ok(format!("[{}]({})\n", text("linkText")?, text("link")?))
        }
    }

    fn lines(items: &[&str]) -> Vec<Line> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_insert_at_section_start_and_end() {
        let library = Library::new();
        let target = library
            .add_note_with_key("TGT1", lines(&["# Target"]))
            .await
            .unwrap();
        let current = library
            .add_note(lines(&["# X", "a", "b", "# Y", "c"]))
            .await
            .unwrap();
        let config = Config::default();

        let outline = build_outline(&library.get_lines(current).await.unwrap());
        let index = insert_links(
            &library,
            &MarkdownLinks,
            &config,
            current,
            &[target],
            Some(&outline[0]),
            InsertPosition::Start,
        )
        .await
        .unwrap();
        assert_eq!(index, 1);

        let outline = build_outline(&library.get_lines(current).await.unwrap());
        let index = insert_links(
            &library,
            &MarkdownLinks,
            &config,
            current,
            &[target],
            Some(&outline[0]),
            InsertPosition::End,
        )
        .await
        .unwrap();
        assert_eq!(index, 4);

        let link = "[Target](zotero://note/1/TGT1/)";
        assert_eq!(
            library.get_lines(current).await.unwrap(),
            lines(&["# X", link, "a", "b", link, "# Y", "c"])
        );
    }

    #[tokio::test]
    async fn test_insert_without_section_appends() {
        let library = Library::new();
        let a = library.add_note(lines(&["# A"])).await.unwrap();
        let b = library.add_note_with_key("BBBB", Vec::new()).await.unwrap();
        let current = library.add_note(lines(&["only text"])).await.unwrap();

        let index = insert_links(
            &library,
            &MarkdownLinks,
            &Config::default(),
            current,
            &[a, b],
            None,
            InsertPosition::Start,
        )
        .await
        .unwrap();

        assert_eq!(index, 1);
        let result = library.get_lines(current).await.unwrap();
        assert_eq!(result.len(), 3);
        assert!(result[1].starts_with("[A](zotero://note/1/"));
        // An untitled note shows its link as text
        assert_eq!(result[2], "[zotero://note/1/BBBB/](zotero://note/1/BBBB/)");
    }

    #[tokio::test]
    async fn test_missing_target_fails_without_writing() {
        let library = Library::new();
        let current = library.add_note(lines(&["x"])).await.unwrap();

        let err = insert_links(
            &library,
            &MarkdownLinks,
            &Config::default(),
            current,
            &[NoteId(99)],
            None,
            InsertPosition::End,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LinkError::Store(StoreError::NoteNotFound(_))));
        assert_eq!(library.get_lines(current).await.unwrap(), lines(&["x"]));
    }
}
