//! Export synchronization
//!
//! A note is either unsynced (no record) or synced to a fixed directory and
//! filename. The first sync export creates the record, later exports reuse
//! it, and only an explicit unsync removes it.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = SyncRegistry::with_path(config.sync_registry_path())?;
//! registry.record(note, &dir, "Note.md")?;
//! ```

mod registry;

pub use registry::{SyncRegistry, SyncStatus};
