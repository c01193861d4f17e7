//! Where serialized index documents go

use async_trait::async_trait;
use std::path::PathBuf;

use crate::utils::{sanitize_file_stem, unique_path};
use crate::{Error, Result};

/// Reference to a stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Opaque reference recorded on the Release
    pub reference: String,
    /// Bytes written
    pub size: u64,
}

/// Destination for serialized index documents
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `document` for the Binary called `name`
    async fn store(&self, name: &str, document: &str) -> Result<StoredArtifact>;
}

/// Writes `<name>.nzb` files under a directory
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    /// Store documents under `dir`, created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn store(&self, name: &str, document: &str) -> Result<StoredArtifact> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::Artifact(format!("failed to create {}: {}", self.dir.display(), e))
        })?;

        let path = unique_path(&self.dir.join(format!("{}.nzb", sanitize_file_stem(name))))?;
        tokio::fs::write(&path, document.as_bytes())
            .await
            .map_err(|e| Error::Artifact(format!("failed to write {}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), bytes = document.len(), "stored index document");

        Ok(StoredArtifact {
            reference: path.to_string_lossy().into_owned(),
            size: document.len() as u64,
        })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_document_and_reports_size() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path().join("nzbs"));

        let stored = store.store("Show.S01E01", "<nzb/>").await.unwrap();

        assert_eq!(stored.size, 6);
        assert!(stored.reference.ends_with("Show.S01E01.nzb"));
        assert_eq!(std::fs::read_to_string(&stored.reference).unwrap(), "<nzb/>");
    }

    #[tokio::test]
    async fn same_name_twice_does_not_clobber() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());

        let first = store.store("Show", "one").await.unwrap();
        let second = store.store("Show", "two").await.unwrap();

        assert_ne!(first.reference, second.reference);
        assert_eq!(std::fs::read_to_string(&first.reference).unwrap(), "one");
    }

    #[tokio::test]
    async fn unsafe_names_stay_inside_the_directory() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());

        let stored = store.store("../../etc/passwd", "x").await.unwrap();

        assert!(std::path::Path::new(&stored.reference).starts_with(dir.path()));
    }
}
