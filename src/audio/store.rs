//! Disk-backed content store for uploaded audio.
//!
//! The catalog treats stored content as an opaque handle; this store is the
//! boundary where bytes actually land on disk. Content files are named by
//! their library id, so the original filename never influences paths.

use crate::error::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the uploads directory exists. Called once at startup.
    pub async fn init(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        info!("Upload storage ready at {}", self.root.display());
        Ok(())
    }

    /// Persist content under the given name and return its content handle.
    ///
    /// Refuses to overwrite an existing file: content names are derived from
    /// fresh library ids, so a collision would mean an id was reused.
    pub async fn save(&self, name: &str, content: &[u8]) -> AppResult<PathBuf> {
        let path = self.root.join(name);

        if tokio::fs::try_exists(&path).await? {
            return Err(AppError::Internal(format!(
                "refusing to overwrite existing content: {}",
                path.display()
            )));
        }

        tokio::fs::write(&path, content).await?;
        debug!("Stored {} bytes at {}", content.len(), path.display());
        Ok(path)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_store() -> DiskStore {
        DiskStore::new(std::env::temp_dir().join(format!("store-test-{}", Uuid::new_v4())))
    }

    #[tokio::test]
    async fn test_save_writes_content() {
        let store = temp_store();
        store.init().await.unwrap();

        let path = store.save("a.mp3", b"ABC").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"ABC");

        tokio::fs::remove_dir_all(store.root()).await.ok();
    }

    #[tokio::test]
    async fn test_save_refuses_overwrite() {
        let store = temp_store();
        store.init().await.unwrap();

        store.save("a.mp3", b"ABC").await.unwrap();
        let err = store.save("a.mp3", b"DEF").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        tokio::fs::remove_dir_all(store.root()).await.ok();
    }
}
