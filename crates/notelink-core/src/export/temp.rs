//! Temporary notes
//!
//! Embedding writes the resolved document into a fresh note. The guard
//! erases that note on every exit path unless it is explicitly kept,
//! including when the export future is dropped mid-flight.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::host::ExportHost;
use crate::models::{Line, NoteId};
use crate::store::{LineStore, StoreResult};

pub struct TempNote {
    store: Arc<dyn LineStore>,
    host: Arc<dyn ExportHost>,
    id: NoteId,
    armed: bool,
}

impl TempNote {
    /// Create a note holding `lines`
    pub async fn create(
        store: Arc<dyn LineStore>,
        host: Arc<dyn ExportHost>,
        lines: Vec<Line>,
    ) -> StoreResult<Self> {
        let id = store.create_note().await?;
        // Armed before the first fallible step so a failed write still cleans up
        let note = Self {
            store,
            host,
            id,
            armed: true,
        };
        note.store.set_lines(id, lines).await?;
        debug!("Created temporary note {}", id);
        Ok(note)
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    /// Keep the note; it is no longer temporary
    pub fn keep(mut self) -> NoteId {
        self.armed = false;
        self.id
    }

    /// Close any viewer of the note and erase it
    pub async fn discard(mut self) -> StoreResult<()> {
        self.armed = false;
        self.host.close_viewer(self.id).await;
        self.store.erase(self.id).await?;
        debug!("Erased temporary note {}", self.id);
        Ok(())
    }
}

impl Drop for TempNote {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let store = Arc::clone(&self.store);
        let host = Arc::clone(&self.host);
        let id = self.id;
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    host.close_viewer(id).await;
                    if let Err(e) = store.erase(id).await {
                        warn!("Failed to erase abandoned temporary note {}: {}", id, e);
                    }
                });
            }
            Err(_) => warn!("No runtime to erase abandoned temporary note {}", id),
        }
    }
}
