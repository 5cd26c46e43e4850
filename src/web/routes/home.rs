use axum::Json;
use serde::Serialize;

pub const HOME_MESSAGE: &str = "Limited Edition Tees API running";

#[derive(Debug, Serialize)]
pub struct HomeMessage {
    message: &'static str,
}

pub async fn home() -> Json<HomeMessage> {
    Json(HomeMessage {
        message: HOME_MESSAGE,
    })
}
