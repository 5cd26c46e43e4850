use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use tracing::info;

use crate::{
    store::{strip_internal_id, Filter, StoreError},
    web::{
        types::{CatalogItem, DataParsingError, STATUS_ARCHIVED, STATUS_CURRENT},
        WebResult,
    },
    AppState,
};

/// Number of archived tees returned when no `limit` is given.
pub const ARCHIVE_DEFAULT_LIMIT: u32 = 24;

// ###################################
// ->   ERROR
// ###################################
#[derive(Debug, thiserror::Error)]
pub enum TeesError {
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("invalid catalog record: {0}")]
    InvalidRecord(#[from] DataParsingError),
}

// ###################################
// ->   QUERIES
// ###################################
#[derive(Debug, Deserialize)]
pub struct CurrentQuery {
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveQuery {
    pub limit: Option<u32>,
}

// ###################################
// ->   API
// ###################################
#[tracing::instrument(name = "Fetching current tees", skip(app_state, query))]
pub async fn tees_current(
    State(app_state): State<AppState>,
    query: Result<Query<CurrentQuery>, QueryRejection>,
) -> WebResult<Json<Vec<CatalogItem>>> {
    let Query(CurrentQuery { month }) = query?;
    let month = month.unwrap_or_else(current_utc_month);

    let filter = Filter::new()
        .eq("release_month", month.as_str())
        .eq("status", STATUS_CURRENT);
    let tees = fetch_catalog(&app_state, &filter, None).await?;
    info!("{} current tees for {month}", tees.len());

    Ok(Json(tees))
}

#[tracing::instrument(name = "Fetching archived tees", skip(app_state, query))]
pub async fn tees_archive(
    State(app_state): State<AppState>,
    query: Result<Query<ArchiveQuery>, QueryRejection>,
) -> WebResult<Json<Vec<CatalogItem>>> {
    let Query(ArchiveQuery { limit }) = query?;
    let limit = limit.unwrap_or(ARCHIVE_DEFAULT_LIMIT);

    let filter = Filter::new().eq("status", STATUS_ARCHIVED);
    let tees = fetch_catalog(&app_state, &filter, Some(limit)).await?;
    info!("{} archived tees (limit {limit})", tees.len());

    Ok(Json(tees))
}

// ###################################
// ->   HELPERS
// ###################################

/// Queries the catalog collection and parses every document, failing on the first invalid one.
async fn fetch_catalog(
    app_state: &AppState,
    filter: &Filter,
    limit: Option<u32>,
) -> Result<Vec<CatalogItem>, TeesError> {
    let docs = app_state
        .store
        .get_documents(&app_state.collections.catalog, filter, limit)
        .await?;

    let tees = docs
        .into_iter()
        .map(strip_internal_id)
        .map(CatalogItem::from_document)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(tees)
}

/// The current month in UTC as `YYYY-MM`.
pub fn current_utc_month() -> String {
    let now = Utc::now();
    format!("{:04}-{:02}", now.year(), now.month())
}
