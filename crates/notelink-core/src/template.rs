//! Template renderer seam
//!
//! Link display text and export filenames are produced by an external
//! template engine. The core passes a template id, named positional
//! arguments and a dry-run flag, and never interprets the template itself.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::NoteId;

/// Argument handed to a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    Text(String),
    /// A note the template may inspect (title, key, ...)
    Note(NoteId),
}

impl TemplateValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TemplateValue::Text(text) => Some(text),
            TemplateValue::Note(_) => None,
        }
    }

    pub fn as_note(&self) -> Option<NoteId> {
        match self {
            TemplateValue::Note(id) => Some(*id),
            TemplateValue::Text(_) => None,
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(text: &str) -> Self {
        TemplateValue::Text(text.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(text: String) -> Self {
        TemplateValue::Text(text)
    }
}

impl From<NoteId> for TemplateValue {
    fn from(id: NoteId) -> Self {
        TemplateValue::Note(id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Render without side effects on the notes passed as arguments
    pub dry_run: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Template {template} expects argument '{argument}'")]
    MissingArgument { template: String, argument: String },

    #[error("Template {template} failed: {details}")]
    Failed { template: String, details: String },
}

/// Pure rendering of a named template
///
/// `argument_names` and `arguments` are parallel slices.
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    async fn render(
        &self,
        template_id: &str,
        argument_names: &[&str],
        arguments: &[TemplateValue],
        options: RenderOptions,
    ) -> Result<String, TemplateError>;
}

/// Look up a named argument in parallel name/value slices
pub fn argument<'a>(
    argument_names: &[&str],
    arguments: &'a [TemplateValue],
    name: &str,
) -> Option<&'a TemplateValue> {
    argument_names
        .iter()
        .position(|n| *n == name)
        .and_then(|i| arguments.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_lookup() {
        let names = ["link", "noteItem"];
        let values = [TemplateValue::from("zotero://note/1/A/"), NoteId(4).into()];

        assert_eq!(
            argument(&names, &values, "link").and_then(|v| v.as_text()),
            Some("zotero://note/1/A/")
        );
        assert_eq!(
            argument(&names, &values, "noteItem").and_then(|v| v.as_note()),
            Some(NoteId(4))
        );
        assert!(argument(&names, &values, "linkText").is_none());
    }

    #[test]
    fn test_error_display() {
        let err = TemplateError::MissingArgument {
            template: "[QuickInsertV2]".to_string(),
            argument: "link".to_string(),
        };
        assert_eq!(err.to_string(), "Template [QuickInsertV2] expects argument 'link'");
    }
}
