//! File-backed document store.
//!
//! Each document lives in its own pretty-printed JSON file:
//!
//! ```text
//! store_dir/
//! └── articles/
//!     ├── 3fJk0aQz9LmP2xYc7RtB.json
//!     └── ...
//! ```
//!
//! Writes go to a temporary sibling and are renamed into place, so readers
//! never observe a half-written document.

use crate::error::StoreError;
use crate::store::{Document, DocumentStore, Query, doc_id, merge_update, new_document, new_id};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (creating if needed) the `collection` directory under `root`.
    #[instrument(level = "info", skip_all, fields(root = %root.as_ref().display(), %collection))]
    pub async fn open(root: impl AsRef<Path>, collection: &str) -> Result<Self, StoreError> {
        if !is_valid_name(collection) {
            return Err(StoreError::InvalidDocument(format!(
                "invalid collection name {collection:?}"
            )));
        }
        let dir = root.as_ref().join(collection);
        fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), "Opened JSON document store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_name(id) {
            return Err(StoreError::InvalidDocument(format!("invalid document id {id:?}")));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    async fn read(&self, path: &Path) -> Result<Option<Document>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &Path, doc: &Document) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(doc)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "Wrote document");
        Ok(())
    }
}

/// Ids and collection names become file names, so keep them to a safe set.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl DocumentStore for JsonFileStore {
    async fn create(&self, data: Value) -> Result<String, StoreError> {
        let id = new_id();
        self.create_with_id(&id, data).await?;
        Ok(id)
    }

    async fn create_with_id(&self, id: &str, data: Value) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        let doc = new_document(id, data)?;
        let _guard = self.write_lock.lock().await;
        self.write(&path, &doc).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let path = self.path_for(id)?;
        self.read(&path).await
    }

    async fn get_all(&self) -> Result<Vec<Document>, StoreError> {
        let mut docs = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read(&path).await {
                Ok(Some(doc)) => docs.push(doc),
                Ok(None) => {}
                Err(StoreError::Serde(e)) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                }
                Err(e) => return Err(e),
            }
        }
        docs.sort_by(|a, b| doc_id(a).cmp(doc_id(b)));
        Ok(docs)
    }

    async fn update(&self, id: &str, data: Value) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        let _guard = self.write_lock.lock().await;
        let mut doc = self
            .read(&path)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        merge_update(&mut doc, data)?;
        self.write(&path, &doc).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        Ok(query.apply(self.get_all().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Operator;
    use serde_json::json;

    #[tokio::test]
    async fn test_documents_persist_as_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(tmp.path(), "articles").await.unwrap();
        let id = store.create(json!({"slug": "fed-holds"})).await.unwrap();

        let path = tmp.path().join("articles").join(format!("{id}.json"));
        let on_disk: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk["slug"], "fed-holds");
        assert_eq!(on_disk["id"], id.as_str());

        let reopened = JsonFileStore::open(tmp.path(), "articles").await.unwrap();
        let doc = reopened.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(doc["slug"], "fed-holds");
    }

    #[tokio::test]
    async fn test_update_delete_and_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(tmp.path(), "articles").await.unwrap();
        store.create_with_id("one", json!({"viewCount": 0})).await.unwrap();

        store.update("one", json!({"viewCount": 7})).await.unwrap();
        assert_eq!(store.get_by_id("one").await.unwrap().unwrap()["viewCount"], 7);

        assert!(matches!(
            store.update("two", json!({})).await,
            Err(StoreError::NotFound(_))
        ));

        store.delete("one").await.unwrap();
        store.delete("one").await.unwrap();
        assert!(store.get_by_id("one").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(tmp.path(), "articles").await.unwrap();
        assert!(matches!(
            store.get_by_id("../secrets").await,
            Err(StoreError::InvalidDocument(_))
        ));
        assert!(JsonFileStore::open(tmp.path(), "a/b").await.is_err());
    }

    #[tokio::test]
    async fn test_query_and_skip_corrupt_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(tmp.path(), "articles").await.unwrap();
        store.create_with_id("b", json!({"isPublished": true})).await.unwrap();
        store.create_with_id("a", json!({"isPublished": false})).await.unwrap();
        store.create_with_id("c", json!({"isPublished": true})).await.unwrap();
        std::fs::write(tmp.path().join("articles").join("broken.json"), "{not json").unwrap();

        assert_eq!(store.get_all().await.unwrap().len(), 3);

        let docs = store
            .query(&Query::new().filter("isPublished", Operator::Eq, true).limit(1))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["id"], "b");
    }
}
