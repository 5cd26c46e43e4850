//! Contains all the routes that this application can handle.

pub mod api;
mod diagnostics;
mod home;

// re-export errors
pub use api::{subscribe::SubscribeError, tees::TeesError};

use crate::AppState;

use axum::{
    routing::{get, post},
    Router,
};

/// All the routes of the server
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(home::home))
        .route("/test", get(diagnostics::diagnostics))
        .nest("/api", api_routes())
        .with_state(app_state)
}

/// API - Routes nested under "/api" path
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/tees/current", get(api::tees_current))
        .route("/tees/archive", get(api::tees_archive))
        .route("/subscribe", post(api::subscribe))
}
