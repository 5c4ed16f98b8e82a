//! Built-in renderings of the default templates
//!
//! The CLI has no template engine; it understands the two default
//! template ids and rejects everything else, which makes the core fall
//! back to its own naming.

use std::sync::Arc;

use async_trait::async_trait;

use notelink_core::template::{argument, RenderOptions, TemplateError, TemplateValue};
use notelink_core::{LineStore, TemplateRenderer};

/// Default filename template: `<title>.md`
pub const EXPORT_FILENAME: &str = "[ExportMDFileName]";
/// Default link template: `[<linkText>](<link>)`
pub const QUICK_INSERT: &str = "[QuickInsertV2]";

pub struct BuiltinTemplates {
    store: Arc<dyn LineStore>,
}

impl BuiltinTemplates {
    pub fn new(store: Arc<dyn LineStore>) -> Self {
        Self { store }
    }
}

fn missing(template: &str, name: &str) -> TemplateError {
    TemplateError::MissingArgument {
        template: template.to_string(),
        argument: name.to_string(),
    }
}

#[async_trait]
impl TemplateRenderer for BuiltinTemplates {
    async fn render(
        &self,
        template_id: &str,
        argument_names: &[&str],
        arguments: &[TemplateValue],
        _options: RenderOptions,
    ) -> Result<String, TemplateError> {
        match template_id {
            EXPORT_FILENAME => {
                let note = argument(argument_names, arguments, "noteItem")
                    .and_then(TemplateValue::as_note)
                    .ok_or_else(|| missing(template_id, "noteItem"))?;
                let title = self
                    .store
                    .note_title(note)
                    .await
                    .map_err(|e| TemplateError::Failed {
                        template: template_id.to_string(),
                        details: e.to_string(),
                    })?;
                Ok(format!("{}.md", title))
            }
            QUICK_INSERT => {
                let text = |name: &str| {
                    argument(argument_names, arguments, name)
                        .and_then(TemplateValue::as_text)
                        .ok_or_else(|| missing(template_id, name))
                };
                Ok(format!("[{}]({})", text("linkText")?, text("link")?))
            }
            other => Err(TemplateError::UnknownTemplate(other.to_string())),
        }
    }
}
