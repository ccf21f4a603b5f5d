use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
#[error("storage error at {path}: {source}")]
pub struct StorageError {
    pub path: String,
    #[source]
    pub source: std::io::Error,
}

/// Blob storage rooted at a local directory. Paths are storage-relative
/// (e.g. `attachments/1700000000_photo.jpg`).
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    pub async fn put(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let full_path = self.full_path(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError {
                    path: path.to_string(),
                    source,
                })?;
        }
        fs::write(&full_path, data)
            .await
            .map_err(|source| StorageError {
                path: path.to_string(),
                source,
            })
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        fs::read(self.full_path(path))
            .await
            .map_err(|source| StorageError {
                path: path.to_string(),
                source,
            })
    }

    pub async fn exists(&self, path: &str) -> bool {
        fs::try_exists(self.full_path(path)).await.unwrap_or(false)
    }

    /// Delete a blob, tolerating one that is already gone.
    pub async fn delete(&self, path: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.full_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError {
                path: path.to_string(),
                source,
            }),
        }
    }
}
