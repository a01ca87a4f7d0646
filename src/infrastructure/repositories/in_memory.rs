//! In-Memory Document Store
//!
//! Thread-safe, in-memory implementation of the `DocumentStore` port.
//!
//! # Features
//!
//! - **Thread-safe**: Uses `Arc<RwLock>` for concurrent access
//! - **Instrumented**: Counts reads and writes so tests can assert side effects
//! - **Fault injection**: Writes can be forced to fail
//!
//! # Limitations
//!
//! - Data is lost on application restart
//! - No persistence across multiple instances
//!
//! For persistence across runs use `SqliteDocumentStore`.

use crate::domain::errors::StoreError;
use crate::domain::ports::{DocumentStore, WriteMode};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

type DocumentKey = (String, String);

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<HashMap<DocumentKey, Value>>>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get_document` calls so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of successful `set_document` calls so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seeds a document without touching the counters
    pub async fn insert(&self, collection: &str, id: &str, document: Value) {
        self.documents
            .write()
            .await
            .insert((collection.to_string(), id.to_string()), document);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("documents", &"<RwLock>")
            .field("reads", &self.reads())
            .field("writes", &self.writes())
            .finish()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let documents = self.documents.read().await;
        Ok(documents
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Value,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend {
                collection: collection.to_string(),
                id: id.to_string(),
                reason: "write rejected".to_string(),
            });
        }

        let key = (collection.to_string(), id.to_string());
        let mut documents = self.documents.write().await;
        let stored = mode.apply(documents.remove(&key), document);
        documents.insert(key, stored);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
