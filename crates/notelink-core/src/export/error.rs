//! Export error handling

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use super::render::DocumentKind;
use crate::store::{is_disk_full_error, StoreError};

/// Coarse error category reported per export unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Io,
    Store,
    RenderTimeout,
    Render,
    Naming,
    Registry,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "io",
            ErrorKind::Store => "store",
            ErrorKind::RenderTimeout => "render_timeout",
            ErrorKind::Render => "render",
            ErrorKind::Naming => "naming",
            ErrorKind::Registry => "registry",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

/// Errors that can occur while exporting
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Filesystem failure at the destination
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The external renderer never signaled completion
    #[error("{kind} export timed out after {attempts} attempts")]
    RenderTimeout { kind: DocumentKind, attempts: u32 },

    #[error("{kind} export failed: {details}")]
    RenderFailed { kind: DocumentKind, details: String },

    /// The renderer dropped its completion slot without answering
    #[error("{0} renderer went away before finishing")]
    RendererClosed(DocumentKind),

    #[error("No renderer available for {0} export")]
    RendererUnavailable(DocumentKind),

    #[error("Failed to render filename with {template}: {details}")]
    Naming { template: String, details: String },

    #[error("Export cancelled")]
    Cancelled,

    #[error("Sync registry error: {0}")]
    Registry(String),
}

impl ExportError {
    /// Create an error from a failed filesystem operation
    pub fn from_io(source: io::Error, path: impl Into<PathBuf>) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::Store(_) => ErrorKind::Store,
            ExportError::Io { .. } => ErrorKind::Io,
            ExportError::RenderTimeout { .. } => ErrorKind::RenderTimeout,
            ExportError::RenderFailed { .. }
            | ExportError::RendererClosed(_)
            | ExportError::RendererUnavailable(_) => ErrorKind::Render,
            ExportError::Naming { .. } => ErrorKind::Naming,
            ExportError::Registry(_) => ErrorKind::Registry,
            ExportError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            ExportError::Store(e) => e.is_recoverable(),
            ExportError::Io { source, .. } => {
                source.kind() == io::ErrorKind::PermissionDenied
                    || source.kind() == io::ErrorKind::NotFound
                    || is_disk_full_error(source)
            }
            ExportError::RenderTimeout { .. } | ExportError::Naming { .. } => true,
            ExportError::Cancelled => true,
            _ => false,
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            ExportError::Store(e) => e.recovery_suggestion(),
            ExportError::Io { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
                Some("Check permissions of the export directory.")
            }
            ExportError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                Some("The export directory no longer exists. Pick another destination.")
            }
            ExportError::Io { source, .. } if is_disk_full_error(source) => {
                Some("Free up disk space and try again.")
            }
            ExportError::RenderTimeout { .. } => {
                Some("Make sure the note viewer is open and try the export again.")
            }
            ExportError::RendererUnavailable(_) => {
                Some("Word and PDF export need a host application that renders documents.")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteId;

    #[test]
    fn test_kinds() {
        assert_eq!(
            ExportError::Store(StoreError::NoteNotFound(NoteId(1))).kind(),
            ErrorKind::Store
        );
        assert_eq!(
            ExportError::RenderTimeout {
                kind: DocumentKind::Pdf,
                attempts: 500
            }
            .kind(),
            ErrorKind::RenderTimeout
        );
        assert_eq!(
            ExportError::RendererClosed(DocumentKind::Docx).kind(),
            ErrorKind::Render
        );
        assert_eq!(ErrorKind::RenderTimeout.as_str(), "render_timeout");
    }

    #[test]
    fn test_io_classification() {
        let denied = ExportError::from_io(
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            "/out/a.md",
        );
        assert_eq!(denied.kind(), ErrorKind::Io);
        assert!(denied.is_recoverable());
        assert!(denied.recovery_suggestion().is_some());

        let full = ExportError::from_io(
            io::Error::new(io::ErrorKind::Other, "No space left on device"),
            "/out/a.md",
        );
        assert!(full.is_recoverable());

        let other = ExportError::from_io(io::Error::new(io::ErrorKind::Other, "boom"), "/x");
        assert!(!other.is_recoverable());
        assert!(other.recovery_suggestion().is_none());
    }

    #[test]
    fn test_display() {
        let err = ExportError::RenderTimeout {
            kind: DocumentKind::Docx,
            attempts: 3,
        };
        assert_eq!(err.to_string(), "Word export timed out after 3 attempts");
        assert_eq!(
            ExportError::RendererClosed(DocumentKind::Pdf).to_string(),
            "PDF renderer went away before finishing"
        );
    }
}
