//! Blob store capability
//!
//! Profile and party images live in object storage and are referenced from
//! documents by URL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use url::Url;

use crate::error::{Result, WejayError};

/// Object storage addressed by URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads `bytes` and returns the URL they can be fetched from.
    async fn put(&self, bytes: Vec<u8>) -> Result<Url>;

    /// Downloads the blob stored at `url`.
    async fn get(&self, url: &Url) -> Result<Vec<u8>>;
}

/// In-process blob store issuing `memory://blobs/<n>` URLs.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    next_id: AtomicU64,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<Url> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let url = Url::parse(&format!("memory://blobs/{}", id))
            .map_err(|e| WejayError::Storage(format!("Failed to build blob URL: {}", e)))?;
        self.blobs.write().await.insert(url.to_string(), bytes);
        Ok(url)
    }

    async fn get(&self, url: &Url) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| WejayError::Storage(format!("Blob not found: {}", url)).into())
    }
}
