//! `GET /test` - reports whether the document store is configured and reachable.
//! Always answers 200, store failures are reported in the body.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

const ERROR_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Serialize)]
pub struct Diagnostics {
    backend: &'static str,
    database: String,
    database_url: &'static str,
    database_name: &'static str,
    connection_status: &'static str,
    collections: Vec<String>,
}

fn set_or_not(is_set: bool) -> &'static str {
    if is_set {
        "set"
    } else {
        "not set"
    }
}

#[tracing::instrument(name = "Running store diagnostics", skip(app_state))]
pub async fn diagnostics(State(app_state): State<AppState>) -> Json<Diagnostics> {
    let store_info = &app_state.store_info;

    let listed = app_state.store.list_collections().await;
    let (database, connection_status, collections) = match listed {
        Ok(collections) => ("connected".to_string(), "connected", collections),
        Err(er) => {
            warn!("store diagnostics failed: {er}");
            let preview: String = er.to_string().chars().take(ERROR_PREVIEW_CHARS).collect();
            (format!("error: {preview}"), "not connected", Vec::new())
        }
    };

    Json(Diagnostics {
        backend: "running",
        database,
        database_url: set_or_not(store_info.url_configured),
        database_name: set_or_not(store_info.name_configured),
        connection_status,
        collections,
    })
}
