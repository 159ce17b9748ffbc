//! JSON file store: one pretty-printed document per domain.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::port::{Document, Domain, Store};

/// Stores each domain as `<data_dir>/<domain>.json`.
///
/// Missing, empty and unparseable files load as an empty document, so a
/// corrupted file is replaced by the next save of that domain.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_of(&self, domain: Domain) -> PathBuf {
        self.dir.join(domain.file_name())
    }

    async fn read<D: Document>(&self) -> Result<D> {
        let path = self.path_of(D::DOMAIN);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(domain = %D::DOMAIN, path = %path.display(), "No document yet");
                return Ok(D::default());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            warn!(domain = %D::DOMAIN, path = %path.display(), "Empty document, starting fresh");
            return Ok(D::default());
        }

        match serde_json::from_str(&content) {
            Ok(document) => Ok(document),
            Err(e) => {
                warn!(
                    domain = %D::DOMAIN,
                    path = %path.display(),
                    error = %e,
                    "Unreadable document, starting fresh"
                );
                Ok(D::default())
            }
        }
    }

    async fn write<D: Document>(&self, document: &D) -> Result<()> {
        let path = self.path_of(D::DOMAIN);
        let json = serde_json::to_string_pretty(document).map_err(|source| {
            StoreError::Encode {
                domain: D::DOMAIN.key(),
                source,
            }
        })?;

        let write_err = |source| StoreError::Write {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).await.map_err(write_err)?;

        // Write to a sibling temp file, then rename over the target
        let temp_path = path.with_extension("json.tmp");
        let result: std::io::Result<()> = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(json.as_bytes()).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(write_err(e).into());
        }

        debug!(domain = %D::DOMAIN, bytes = json.len(), "Document saved");
        Ok(())
    }
}

impl Store for JsonFileStore {
    async fn load<D: Document>(&self) -> Result<D> {
        self.read().await
    }

    async fn save<D: Document>(&self, document: &D) -> Result<()> {
        self.write(document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ServerId, User, UserId, UsersDoc};

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let doc: UsersDoc = store.load().await.unwrap();
        assert_eq!(doc, UsersDoc::default());
    }

    #[tokio::test]
    async fn save_then_load_returns_same_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));

        let mut doc = UsersDoc::default();
        doc.server_mut(ServerId::new(1))
            .insert(UserId::new(2), User::new("Bo", "bo", 500));
        store.save(&doc).await.unwrap();

        let loaded: UsersDoc = store.load().await.unwrap();
        assert_eq!(loaded, doc);
        assert!(!store.path_of(Domain::Users).with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        std::fs::write(store.path_of(Domain::Users), "{ not json").unwrap();

        let doc: UsersDoc = store.load().await.unwrap();
        assert_eq!(doc, UsersDoc::default());
    }
}
