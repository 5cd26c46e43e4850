//! PostgreSQL-backed document store.
//!
//! Every collection shares one `documents` table and documents are kept as JSONB:
//!
//! | column     | type        |
//! |------------|-------------|
//! | id         | UUID (pk)   |
//! | collection | TEXT        |
//! | body       | JSONB       |
//! | created_at | TIMESTAMPTZ |
//!
//! The table and its indexes are created with `IF NOT EXISTS` statements the first time
//! the store is reached, so a database that is down at startup does not prevent serving.
//! Creation runs in one transaction under an advisory lock, so several processes may race.
//! Declared unique keys become partial unique expression indexes; a violation (SQLSTATE
//! `23505`) is reported as `StoreError::Conflict`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    types::Json,
    PgPool, Postgres, QueryBuilder,
};
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    validate_name, Document, DocumentStore, Filter, StoreError, StoreResult, INTERNAL_ID_FIELD,
    LIST_COLLECTIONS_MAX,
};

/// Advisory lock held while the schema is created.
const SCHEMA_LOCK_KEY: i64 = 0x7465_6564_726f_70;

#[derive(Debug)]
pub struct PgDocumentStore {
    db: PgPool,
    unique_keys: Vec<(String, String)>,
    schema: OnceCell<()>,
}

impl PgDocumentStore {
    /// Creates a store on top of a lazily connecting pool.
    /// No connection is attempted until the first operation.
    pub fn init(
        connect_options: PgConnectOptions,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Self {
        info!("{:<20} - Initializing the DB pool", "init_db");
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(connect_options);

        Self::new(db)
    }

    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            unique_keys: Vec::new(),
            schema: OnceCell::new(),
        }
    }

    /// Declares `field` unique within `collection`. Both names must be valid identifiers.
    pub fn with_unique_key(
        mut self,
        collection: impl Into<String>,
        field: impl Into<String>,
    ) -> StoreResult<Self> {
        let (collection, field) = (collection.into(), field.into());
        validate_name(&collection)?;
        validate_name(&field)?;
        self.unique_keys.push((collection, field));
        Ok(self)
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        self.schema
            .get_or_try_init(|| async {
                let map_err = |e| map_sqlx_error("ensure_schema", e);
                let mut tx = self.db.begin().await.map_err(map_err)?;

                // Concurrent `CREATE ... IF NOT EXISTS` can still collide in the catalog.
                sqlx::query("SELECT pg_advisory_xact_lock($1)")
                    .bind(SCHEMA_LOCK_KEY)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_err)?;

                for statement in schema_statements(&self.unique_keys) {
                    sqlx::query(&statement)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_err)?;
                }

                tx.commit().await.map_err(map_err)?;
                info!("{:<20} - Document store schema ready", "ensure_schema");
                Ok::<(), StoreError>(())
            })
            .await?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    #[tracing::instrument(skip(self, filter), err)]
    async fn get_documents(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<u32>,
    ) -> StoreResult<Vec<Document>> {
        validate_name(collection)?;
        self.ensure_schema().await?;

        let mut query = select_query(collection, filter, limit);
        let rows: Vec<(Uuid, Json<Document>)> = query
            .build_query_as()
            .fetch_all(&self.db)
            .await
            .map_err(|e| map_sqlx_error("get_documents", e))?;
        debug!("fetched {} documents", rows.len());

        Ok(rows
            .into_iter()
            .map(|(id, Json(mut doc))| {
                doc.insert(INTERNAL_ID_FIELD.to_string(), Value::String(id.to_string()));
                doc
            })
            .collect())
    }

    #[tracing::instrument(skip(self, document), err)]
    async fn create_document(
        &self,
        collection: &str,
        mut document: Document,
    ) -> StoreResult<String> {
        validate_name(collection)?;
        self.ensure_schema().await?;

        document.remove(INTERNAL_ID_FIELD);
        let id = Uuid::new_v4();

        sqlx::query(r#"INSERT INTO documents (id, collection, body) VALUES ($1, $2, $3)"#)
            .bind(id)
            .bind(collection)
            .bind(Json(document))
            .execute(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict {
                        collection: collection.to_string(),
                        key: self.unique_key_names(collection),
                    }
                } else {
                    map_sqlx_error("create_document", e)
                }
            })?;

        Ok(id.to_string())
    }

    #[tracing::instrument(skip(self), err)]
    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.ensure_schema().await?;

        let names: Vec<String> = sqlx::query_scalar(
            r#"SELECT DISTINCT collection FROM documents ORDER BY collection LIMIT $1"#,
        )
        .bind(LIST_COLLECTIONS_MAX as i64)
        .fetch_all(&self.db)
        .await
        .map_err(|e| map_sqlx_error("list_collections", e))?;

        Ok(names)
    }
}

impl PgDocumentStore {
    fn unique_key_names(&self, collection: &str) -> String {
        self.unique_keys
            .iter()
            .filter(|(col, _)| col == collection)
            .map(|(_, field)| field.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

// ###################################
// ->   HELPERS
// ###################################

/// DDL for the documents table and its indexes.
/// Names are interpolated, so they must have passed `validate_name` beforehand.
fn schema_statements(unique_keys: &[(String, String)]) -> Vec<String> {
    let mut statements = vec![
        r#"CREATE TABLE IF NOT EXISTS documents (
            id UUID PRIMARY KEY,
            collection TEXT NOT NULL,
            body JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
        )"#
            .to_string(),
        r#"CREATE INDEX IF NOT EXISTS documents_collection_created_at_idx
            ON documents (collection, created_at)"#
            .to_string(),
    ];

    for (collection, field) in unique_keys {
        statements.push(format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS documents_{collection}_{field}_key \
             ON documents ((body->>'{field}')) WHERE collection = '{collection}'"
        ));
    }

    statements
}

/// Builds `SELECT id, body FROM documents WHERE collection = $1 AND body -> $k = $v ...`.
fn select_query<'a>(
    collection: &str,
    filter: &Filter,
    limit: Option<u32>,
) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new("SELECT id, body FROM documents WHERE collection = ");
    query.push_bind(collection.to_string());

    for (field, value) in filter.iter() {
        query.push(" AND body -> ");
        query.push_bind(field.clone());
        query.push("::text = ");
        query.push_bind(Json(value.clone()));
        query.push("::jsonb");
    }

    query.push(" ORDER BY created_at, id");

    if let Some(limit) = limit {
        query.push(" LIMIT ");
        query.push_bind(i64::from(limit));
    }

    query
}

/// Unique violation: SQLSTATE `23505`.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// Maps sqlx errors onto the store taxonomy.
///
/// | sqlx error                          | StoreError    |
/// |-------------------------------------|---------------|
/// | PoolTimedOut, PoolClosed, Io, Tls   | `Unavailable` |
/// | anything else                       | `Query`       |
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(format!("{operation}: {err}")),
        _ => StoreError::Query(format!("{operation}: {err}")),
    }
}
