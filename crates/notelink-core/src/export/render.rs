//! External document rendering
//!
//! Word and PDF output are produced by a host-controlled rendering surface.
//! The exporter sends a one-shot request carrying the resolved document and
//! then waits for the renderer to fill a [`RenderCompletion`] slot. When the
//! renderer cannot signal completion it may instead answer polls; the wait
//! is bounded either way.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::debug;

use super::error::ExportError;
use crate::models::NoteId;

/// Document formats delegated to the external renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Docx,
    Pdf,
}

impl DocumentKind {
    /// Name of the one-shot signal sent to the rendering surface
    pub fn signal(&self) -> &'static str {
        match self {
            DocumentKind::Docx => "exportDocx",
            DocumentKind::Pdf => "exportPDF",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Docx => "docx",
            DocumentKind::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Docx => write!(f, "Word"),
            DocumentKind::Pdf => write!(f, "PDF"),
        }
    }
}

/// A fully resolved document handed to the renderer
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub kind: DocumentKind,
    pub note: NoteId,
    pub title: String,
    pub markdown: String,
}

/// What the renderer produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutput {
    /// Finished document bytes for the exporter to write
    Content(Vec<u8>),
    /// The host delivered the document itself (e.g. printed it)
    Delivered,
}

type RenderResult = Result<RenderOutput, String>;

/// Completion slot, fulfilled at most once
#[derive(Debug)]
pub struct RenderCompletion {
    sender: oneshot::Sender<RenderResult>,
}

impl RenderCompletion {
    /// Create a slot and the receiving end the exporter waits on
    pub fn channel() -> (Self, oneshot::Receiver<RenderResult>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    pub fn complete(self, output: RenderOutput) {
        // The exporter may already have given up
        let _ = self.sender.send(Ok(output));
    }

    pub fn fail(self, details: impl Into<String>) {
        let _ = self.sender.send(Err(details.into()));
    }
}

#[async_trait]
pub trait ExternalRenderer: Send + Sync {
    /// Send the render signal for `request`
    ///
    /// The renderer owns `completion` and fulfils it when done. Dropping it
    /// unfulfilled means no completion event will come.
    async fn request(
        &self,
        request: RenderRequest,
        completion: RenderCompletion,
    ) -> Result<(), ExportError>;

    /// Polling fallback, checked once per interval
    async fn poll(&self, _kind: DocumentKind) -> Option<RenderResult> {
        None
    }

    /// Whether [`ExternalRenderer::poll`] can ever answer
    fn supports_polling(&self) -> bool {
        false
    }
}

/// Wait for a render to finish
///
/// Waits on the completion slot and polls the renderer every `interval`,
/// giving up with [`ExportError::RenderTimeout`] after `max_attempts`
/// intervals.
pub async fn await_render(
    renderer: &dyn ExternalRenderer,
    kind: DocumentKind,
    receiver: oneshot::Receiver<RenderResult>,
    interval: Duration,
    max_attempts: u32,
) -> Result<RenderOutput, ExportError> {
    let mut receiver = Some(receiver);

    for attempt in 1..=max_attempts {
        let dropped = match receiver.as_mut() {
            Some(rx) => tokio::select! {
                result = rx => match result {
                    Ok(result) => return settle(kind, result),
                    Err(_) => true,
                },
                _ = sleep(interval) => false,
            },
            None => {
                sleep(interval).await;
                false
            }
        };

        if dropped {
            if !renderer.supports_polling() {
                return Err(ExportError::RendererClosed(kind));
            }
            debug!("{} completion slot dropped, polling instead", kind);
            receiver = None;
        }

        if let Some(result) = renderer.poll(kind).await {
            debug!("{} render finished after {} poll(s)", kind, attempt);
            return settle(kind, result);
        }
    }

    Err(ExportError::RenderTimeout {
        kind,
        attempts: max_attempts,
    })
}

fn settle(kind: DocumentKind, result: RenderResult) -> Result<RenderOutput, ExportError> {
    result.map_err(|details| ExportError::RenderFailed { kind, details })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const TICK: Duration = Duration::from_millis(1);

    /// Completes the slot from a spawned task
    struct Signalling;

    #[async_trait]
    impl ExternalRenderer for Signalling {
        async fn request(
            &self,
            request: RenderRequest,
            completion: RenderCompletion,
        ) -> Result<(), ExportError> {
            tokio::spawn(async move {
                completion.complete(RenderOutput::Content(request.markdown.into_bytes()));
            });
            Ok(())
        }
    }

    /// Keeps the slot forever and never answers polls
    struct Silent {
        held: Mutex<Option<RenderCompletion>>,
    }

    #[async_trait]
    impl ExternalRenderer for Silent {
        async fn request(&self, _: RenderRequest, completion: RenderCompletion) -> Result<(), ExportError> {
            *self.held.lock().unwrap() = Some(completion);
            Ok(())
        }
    }

    /// Drops the slot and answers the third poll
    struct Polled {
        polls: AtomicU32,
    }

    #[async_trait]
    impl ExternalRenderer for Polled {
        async fn request(&self, _: RenderRequest, _: RenderCompletion) -> Result<(), ExportError> {
            Ok(())
        }

        async fn poll(&self, _kind: DocumentKind) -> Option<RenderResult> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            (n >= 3).then_some(Ok(RenderOutput::Delivered))
        }

        fn supports_polling(&self) -> bool {
            true
        }
    }

    /// Drops the slot and cannot be polled
    struct Vanishing;

    #[async_trait]
    impl ExternalRenderer for Vanishing {
        async fn request(&self, _: RenderRequest, _: RenderCompletion) -> Result<(), ExportError> {
            Ok(())
        }
    }

    fn request(kind: DocumentKind) -> RenderRequest {
        RenderRequest {
            kind,
            note: NoteId(1),
            title: "Doc".to_string(),
            markdown: "# Doc\n".to_string(),
        }
    }

    async fn run(renderer: &dyn ExternalRenderer, attempts: u32) -> Result<RenderOutput, ExportError> {
        let (completion, receiver) = RenderCompletion::channel();
        renderer
            .request(request(DocumentKind::Docx), completion)
            .await
            .unwrap();
        await_render(renderer, DocumentKind::Docx, receiver, TICK, attempts).await
    }

    #[tokio::test]
    async fn test_completion_signal() {
        let output = run(&Signalling, 100).await.unwrap();
        assert_eq!(output, RenderOutput::Content(b"# Doc\n".to_vec()));
    }

    #[tokio::test]
    async fn test_timeout_after_attempt_cap() {
        let renderer = Silent {
            held: Mutex::new(None),
        };
        let err = run(&renderer, 5).await.unwrap_err();
        assert!(matches!(
            err,
            ExportError::RenderTimeout {
                kind: DocumentKind::Docx,
                attempts: 5
            }
        ));
    }

    #[tokio::test]
    async fn test_polling_fallback() {
        let renderer = Polled {
            polls: AtomicU32::new(0),
        };
        assert_eq!(run(&renderer, 10).await.unwrap(), RenderOutput::Delivered);
        assert_eq!(renderer.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_dropped_slot_without_polling() {
        let err = run(&Vanishing, 10).await.unwrap_err();
        assert!(matches!(err, ExportError::RendererClosed(DocumentKind::Docx)));
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let (completion, receiver) = RenderCompletion::channel();
        completion.fail("printer on fire");
        let err = await_render(&Vanishing, DocumentKind::Pdf, receiver, TICK, 3)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "PDF export failed: printer on fire");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(DocumentKind::Docx.signal(), "exportDocx");
        assert_eq!(DocumentKind::Pdf.signal(), "exportPDF");
        assert_eq!(DocumentKind::Pdf.extension(), "pdf");
    }
}
