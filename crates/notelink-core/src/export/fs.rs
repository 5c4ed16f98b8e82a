//! Filesystem adapter for export destinations

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Abstract interface for writing export output
#[async_trait]
pub trait ExportFs: Send + Sync {
    /// Create a directory and its parents if missing
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Write a whole file. A failed write must not leave a partial file.
    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    async fn exists(&self, path: &Path) -> bool;
}

/// Local disk implementation
///
/// Writes go to a hidden temporary file next to the target which is renamed
/// over it once synced.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl LocalFs {
    fn temp_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.notelink-tmp", name))
    }
}

#[async_trait]
impl ExportFs for LocalFs {
    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let temp_path = Self::temp_path(path);

        let result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(contents).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, path).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&temp_path).await;
        }
        result
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }
}
