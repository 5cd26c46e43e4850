//! The document store gateway.
//!
//! Records live as JSON objects (`Document`) grouped into named collections.
//! Reads use equality-only `Filter`s, writes append a new document and hand back
//! the store-generated identifier.
//!
//! Two implementations are provided:
//! - `PgDocumentStore` keeps every collection in one PostgreSQL JSONB table.
//! - `InMemoryDocumentStore` keeps everything in process memory; used by tests.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PgDocumentStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use lazy_regex::regex_is_match;
use serde::Serialize;
use serde_json::{Map, Value};

/// Key under which the store-generated identifier is attached to returned documents.
pub const INTERNAL_ID_FIELD: &str = "_id";

/// Maximum number of collection names reported by `DocumentStore::list_collections`.
pub const LIST_COLLECTIONS_MAX: usize = 10;

pub type Document = Map<String, Value>;

// ###################################
// ->   TRAIT
// ###################################
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Returns the documents of `collection` matching every pair in `filter`,
    /// in insertion order and bounded by `limit` (`None` means unbounded).
    ///
    /// Each returned document carries its identifier under `INTERNAL_ID_FIELD`.
    async fn get_documents(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<u32>,
    ) -> StoreResult<Vec<Document>>;

    /// Persists `document` into `collection` and returns the generated identifier.
    async fn create_document(&self, collection: &str, document: Document) -> StoreResult<String>;

    /// Names of the non-empty collections, sorted, at most `LIST_COLLECTIONS_MAX`.
    async fn list_collections(&self) -> StoreResult<Vec<String>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let mut docs = self.get_documents(collection, filter, Some(1)).await?;
        Ok(docs.pop())
    }
}

// ###################################
// ->   FILTER
// ###################################
/// An equality filter: a document matches when every field is present and equal to its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(BTreeMap<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.0
            .iter()
            .all(|(field, value)| document.get(field) == Some(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

// ###################################
// ->   HELPERS
// ###################################
/// Removes the store-generated identifier so the document only holds public fields.
pub fn strip_internal_id(mut document: Document) -> Document {
    document.remove(INTERNAL_ID_FIELD);
    document
}

/// Serializes a record into a `Document`. The record must serialize to a JSON object.
pub fn to_document<T: Serialize>(record: &T) -> StoreResult<Document> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

/// Collection and field names end up in SQL identifiers and index names.
pub fn validate_name(name: &str) -> StoreResult<()> {
    if regex_is_match!(r"^[a-z][a-z0-9_]{0,62}$", name) {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

// ###################################
// ->   ERROR
// ###################################
pub type StoreResult<T> = core::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("duplicate value for unique key '{key}' in collection '{collection}'")]
    Conflict { collection: String, key: String },
    #[error("invalid collection or field name: '{0}'")]
    InvalidCollection(String),
    #[error("document is not a json object")]
    NotAnObject,
    #[error("query failed: {0}")]
    Query(String),

    #[error("serde_json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}
