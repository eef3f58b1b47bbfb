//! Document store capability
//!
//! Documents are flat JSON field maps addressed by `(collection, id)`.
//! Writes are last-writer-wins; there is no locking across processes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::error::{Result, WejayError};

/// Field map stored in a document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Generic document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a document, returning `None` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>>;

    /// Writes a document.
    ///
    /// With `merge = true` the given fields are merged into the existing
    /// document (top-level keys replaced); otherwise the document is
    /// replaced wholesale.
    async fn set(&self, collection: &str, id: &str, fields: Fields, merge: bool) -> Result<()>;
}

fn apply_write(existing: Option<&mut Fields>, fields: Fields, merge: bool) -> Option<Fields> {
    match existing {
        Some(doc) if merge => {
            doc.extend(fields);
            None
        }
        _ => Some(fields),
    }
}

// ---------------------------------------------------------------------------
// MemoryDocumentStore
// ---------------------------------------------------------------------------

/// In-process document store.
///
/// # Examples
///
/// ```
/// use wejay::backend::{DocumentStore, MemoryDocumentStore};
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let store = MemoryDocumentStore::new();
/// let mut fields = serde_json::Map::new();
/// fields.insert("email".to_string(), serde_json::json!("dj@example.com"));
/// store.set("users", "u1", fields, false).await?;
///
/// let doc = store.get("users", "u1").await?.unwrap();
/// assert_eq!(doc["email"], "dj@example.com");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<(String, String), Fields>>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>> {
        let docs = self.docs.read().await;
        Ok(docs
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields, merge: bool) -> Result<()> {
        let mut docs = self.docs.write().await;
        let key = (collection.to_string(), id.to_string());
        if let Some(replacement) = apply_write(docs.get_mut(&key), fields, merge) {
            docs.insert(key, replacement);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonFileDocumentStore
// ---------------------------------------------------------------------------

type Collections = HashMap<String, HashMap<String, Fields>>;

/// Document store backed by a single JSON file.
///
/// The file holds `{ "<collection>": { "<id>": { ...fields } } }`.  Every
/// write rewrites the file through a temporary sibling and a rename, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileDocumentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileDocumentStore {
    /// Creates a store at `path`.  The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Collections> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(Collections::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                WejayError::Storage(format!(
                    "Failed to parse document file {}: {}",
                    self.path.display(),
                    e
                ))
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Collections::new()),
            Err(e) => Err(WejayError::Io(e).into()),
        }
    }

    async fn write_all(&self, collections: &Collections) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(collections)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>> {
        let collections = self.read_all().await?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields, merge: bool) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut collections = self.read_all().await?;
        let docs = collections.entry(collection.to_string()).or_default();
        if let Some(replacement) = apply_write(docs.get_mut(id), fields, merge) {
            docs.insert(id.to_string(), replacement);
        }
        self.write_all(&collections).await?;
        tracing::debug!(collection, id, path = %self.path.display(), "Document written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, serde_json::Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_memory_get_missing_returns_none() {
        let store = MemoryDocumentStore::new();
        assert!(store.get("users", "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_merge_keeps_other_fields() {
        let store = MemoryDocumentStore::new();
        store
            .set("users", "u1", fields(&[("email", json!("a@b.c"))]), false)
            .await
            .unwrap();
        store
            .set("users", "u1", fields(&[("role", json!("dj"))]), true)
            .await
            .unwrap();

        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc["email"], "a@b.c");
        assert_eq!(doc["role"], "dj");
    }

    #[tokio::test]
    async fn test_memory_replace_drops_other_fields() {
        let store = MemoryDocumentStore::new();
        store
            .set("users", "u1", fields(&[("email", json!("a@b.c"))]), false)
            .await
            .unwrap();
        store
            .set("users", "u1", fields(&[("role", json!("guest"))]), false)
            .await
            .unwrap();

        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert!(doc.get("email").is_none());
        assert_eq!(doc["role"], "guest");
    }

    #[tokio::test]
    async fn test_memory_collections_are_isolated() {
        let store = MemoryDocumentStore::new();
        store
            .set("users", "id", fields(&[("k", json!(1))]), false)
            .await
            .unwrap();
        assert!(store.get("parties", "id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("users.json");

        let store = JsonFileDocumentStore::new(&path);
        store
            .set("users", "u1", fields(&[("is_premium", json!(true))]), false)
            .await
            .unwrap();

        let reopened = JsonFileDocumentStore::new(&path);
        let doc = reopened.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc["is_premium"], true);
    }

    #[tokio::test]
    async fn test_file_store_missing_file_reads_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = JsonFileDocumentStore::new(dir.path().join("absent.json"));
        assert!(store.get("users", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileDocumentStore::new(&path);
        let err = store.get("users", "u1").await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse document file"));
    }
}
