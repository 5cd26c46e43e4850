use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        RwLock,
    },
};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{
    validate_name, Document, DocumentStore, Filter, StoreError, StoreResult, INTERNAL_ID_FIELD,
    LIST_COLLECTIONS_MAX,
};

/// In-memory document store.
///
/// Intended for tests/dev. Unique keys are checked under the same write lock as the insert.
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    collections: RwLock<BTreeMap<String, Vec<Document>>>,
    unique_keys: HashMap<String, Vec<String>>,
    available: AtomicBool,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self {
            collections: RwLock::default(),
            unique_keys: HashMap::new(),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `field` unique within `collection`.
    pub fn with_unique_key(
        mut self,
        collection: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.unique_keys
            .entry(collection.into())
            .or_default()
            .push(field.into());
        self
    }

    /// Simulates the backing store going away (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of documents currently stored in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|cols| cols.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "in-memory store switched off".to_string(),
            ))
        }
    }

    fn conflicting_key(
        &self,
        collection: &str,
        existing: &[Document],
        new: &Document,
    ) -> Option<String> {
        let keys = self.unique_keys.get(collection)?;
        keys.iter()
            .find(|key| match new.get(*key) {
                Some(Value::Null) | None => false,
                Some(value) => existing.iter().any(|doc| doc.get(*key) == Some(value)),
            })
            .cloned()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_documents(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<u32>,
    ) -> StoreResult<Vec<Document>> {
        self.ensure_available()?;
        validate_name(collection)?;

        let cols = self
            .collections
            .read()
            .map_err(|_| StoreError::Query("lock poisoned".to_string()))?;
        let limit = limit.map_or(usize::MAX, |l| l as usize);

        let docs = cols
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(doc))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(docs)
    }

    async fn create_document(
        &self,
        collection: &str,
        mut document: Document,
    ) -> StoreResult<String> {
        self.ensure_available()?;
        validate_name(collection)?;

        let mut cols = self
            .collections
            .write()
            .map_err(|_| StoreError::Query("lock poisoned".to_string()))?;
        let docs = cols.entry(collection.to_string()).or_default();

        if let Some(key) = self.conflicting_key(collection, docs, &document) {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                key,
            });
        }

        let id = Uuid::new_v4().to_string();
        document.insert(INTERNAL_ID_FIELD.to_string(), Value::String(id.clone()));
        docs.push(document);

        Ok(id)
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.ensure_available()?;

        let cols = self
            .collections
            .read()
            .map_err(|_| StoreError::Query("lock poisoned".to_string()))?;

        Ok(cols
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .take(LIST_COLLECTIONS_MAX)
            .collect())
    }
}
