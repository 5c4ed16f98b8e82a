//! notelink Core Library
//!
//! This crate resolves the forward-link graph between notes and exports
//! the result. A note is an ordered sequence of lines; a line may carry
//! links of the form `<scheme>://note/<library>/<key>/` pointing at other
//! notes.
//!
//! # Architecture
//!
//! - **Line store**: the only owner of note content ([`store::LineStore`])
//! - **Resolver**: walks the link graph, embedding or enlisting targets
//! - **Export pipeline**: serializes resolved notes and writes them out
//! - **Sync registry**: remembers where a note was exported to
//!
//! # Quick Start
//!
//! ```text
//! let library = Arc::new(Library::open(config.library_path())?);
//! let registry = Arc::new(SyncRegistry::with_path(config.sync_registry_path())?);
//! let exporter = Exporter::new(library, templates, Arc::new(LocalFs), host, registry, config);
//!
//! let report = exporter.export_note(note, &ExportOptions::default()).await?;
//! ```
//!
//! # Modules
//!
//! - `store`: Line store trait and the JSON-backed library
//! - `scanner`: Forward-link recognition
//! - `outline`: Heading tree of a note
//! - `resolver`: Link-graph traversal
//! - `links`: Link rendering and insertion
//! - `format`: Markdown and mind-map serializers
//! - `export`: Export orchestration
//! - `sync`: Sync registry
//! - `template`: Template renderer capability
//! - `config`: Application configuration

pub mod config;
pub mod export;
pub mod format;
pub mod links;
pub mod models;
pub mod outline;
pub mod resolver;
pub mod scanner;
pub mod store;
pub mod sync;
pub mod template;

pub use config::Config;
pub use export::{ExportError, ExportOptions, ExportReport, Exporter};
pub use models::{ExportMode, InsertPosition, Line, NoteId, NoteKey, OutlineNode, Resource};
pub use resolver::{resolve, Resolution};
pub use scanner::LinkScanner;
pub use store::{LineStore, Library, StoreError};
pub use sync::SyncRegistry;
pub use template::{TemplateError, TemplateRenderer};
