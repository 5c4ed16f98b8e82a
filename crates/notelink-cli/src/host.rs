//! Non-interactive export host
//!
//! Destinations come from the command line instead of dialogs: every file
//! prompt resolves to `<dir>/<suggested name>` and every directory prompt
//! to `<dir>`. Without a directory the prompts count as cancelled.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use notelink_core::export::{ExportHost, FileFilter};
use notelink_core::NoteId;

pub struct CliHost {
    dir: Option<PathBuf>,
}

impl CliHost {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl ExportHost for CliHost {
    async fn pick_file(
        &self,
        title: &str,
        suggested_name: &str,
        filter: &FileFilter,
    ) -> Option<PathBuf> {
        let path = self.dir.as_ref()?.join(suggested_name);
        debug!("{} ({}): using {:?}", title, filter.pattern, path);
        Some(path)
    }

    async fn pick_directory(&self, title: &str) -> Option<PathBuf> {
        if self.dir.is_none() {
            info!("{}: no directory given (use --dir)", title);
        }
        self.dir.clone()
    }

    async fn open_viewer(&self, note: NoteId) {
        debug!("Viewer requested for note {}", note);
    }

    fn notify(&self, message: &str) {
        debug!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prompts_resolve_to_directory() {
        let host = CliHost::new(Some(PathBuf::from("/out")));
        assert_eq!(
            host.pick_file("Export", "Note.md", &FileFilter::MARKDOWN).await,
            Some(PathBuf::from("/out/Note.md"))
        );
        assert_eq!(host.pick_directory("Export").await, Some(PathBuf::from("/out")));
    }

    #[tokio::test]
    async fn test_no_directory_cancels() {
        let host = CliHost::new(None);
        assert_eq!(host.pick_file("Export", "Note.md", &FileFilter::MARKDOWN).await, None);
        assert_eq!(host.pick_directory("Export").await, None);
    }
}
