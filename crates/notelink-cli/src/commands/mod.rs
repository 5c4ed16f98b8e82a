//! Command handlers

pub mod config;
pub mod export;
pub mod import;
pub mod link;
pub mod list;
pub mod outline;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use notelink_core::export::{Exporter, LocalFs};
use notelink_core::{Config, LineStore, Library, SyncRegistry};

use crate::host::CliHost;
use crate::templates::BuiltinTemplates;

/// Everything a command needs: configuration, library and sync registry
pub struct Context {
    pub config: Config,
    pub library: Arc<Library>,
    pub registry: Arc<SyncRegistry>,
}

impl Context {
    /// Open the library and sync registry under the configured data directory
    pub fn open(config: Config) -> Result<Self> {
        let library_path = config.library_path();
        let library = Library::open(&library_path)
            .with_context(|| format!("Failed to open note library at {:?}", library_path))?;
        let registry = SyncRegistry::with_path(config.sync_registry_path())
            .context("Failed to load sync registry")?;

        Ok(Self {
            config,
            library: Arc::new(library),
            registry: Arc::new(registry),
        })
    }

    /// Exporter whose prompts resolve to `dir`
    pub fn exporter(&self, dir: Option<PathBuf>) -> Exporter {
        let store: Arc<dyn LineStore> = self.library.clone();
        Exporter::new(
            Arc::clone(&store),
            Arc::new(BuiltinTemplates::new(store)),
            Arc::new(LocalFs),
            Arc::new(CliHost::new(dir)),
            Arc::clone(&self.registry),
            self.config.clone(),
        )
    }
}
