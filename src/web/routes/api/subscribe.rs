use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::{
    store::{to_document, Filter, StoreError},
    web::{
        types::{ValidSubscriber, SUBSCRIBER_KEY},
        WebResult,
    },
    AppState,
};

pub const SUBSCRIBED_MSG: &str = "Subscribed successfully.";
pub const ALREADY_SUBSCRIBED_MSG: &str = "You're already subscribed.";

// ###################################
// ->   ERROR
// ###################################
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    #[error("{0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub status: &'static str,
    pub message: &'static str,
}

impl Acknowledgement {
    fn ok(message: &'static str) -> Json<Self> {
        Json(Self {
            status: "ok",
            message,
        })
    }
}

// ###################################
// ->   API
// ###################################
#[tracing::instrument(
    name = "Saving new subscriber",
    skip(app_state, subscriber),
    fields(subscriber_email = %subscriber.email.as_ref())
)]
pub async fn subscribe(
    State(app_state): State<AppState>,
    subscriber: ValidSubscriber,
) -> WebResult<Json<Acknowledgement>> {
    let collection = &app_state.collections.subscribers;
    let by_email = Filter::new().eq(SUBSCRIBER_KEY, subscriber.email.as_ref());

    let existing = app_state
        .store
        .find_one(collection, &by_email)
        .await
        .map_err(SubscribeError::Store)?;
    if existing.is_some() {
        info!("already subscribed");
        return Ok(Acknowledgement::ok(ALREADY_SUBSCRIBED_MSG));
    }

    let document = to_document(&subscriber).map_err(SubscribeError::Store)?;
    match app_state.store.create_document(collection, document).await {
        Ok(id) => {
            info!(subscriber_id = %id, "SUCCESS");
            Ok(Acknowledgement::ok(SUBSCRIBED_MSG))
        }
        // Lost the race against a concurrent request for the same email.
        Err(StoreError::Conflict { .. }) => {
            info!("already subscribed (unique key conflict)");
            Ok(Acknowledgement::ok(ALREADY_SUBSCRIBED_MSG))
        }
        Err(er) => Err(SubscribeError::Store(er).into()),
    }
}
