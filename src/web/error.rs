use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use strum_macros::AsRefStr;

use super::routes::{SubscribeError, TeesError};
use super::types::DataParsingError;

pub type WebResult<T> = core::result::Result<T, Error>;

#[derive(Debug, AsRefStr, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] DataParsingError),
    #[error("json rejection: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("query rejection: {0}")]
    QueryRejection(#[from] QueryRejection),

    #[error("tees error: {0}")]
    Tees(#[from] TeesError),
    #[error("subscribe error: {0}")]
    Subscribe(#[from] SubscribeError),
}

impl Error {
    pub fn status_code_and_client_error(&self) -> (StatusCode, ClientError) {
        use ClientError::*;

        match self {
            Error::InvalidInput(data_er) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                InvalidInput(data_er.to_string()),
            ),
            Error::JsonRejection(rej) => (rej.status(), InvalidInput(rej.body_text())),
            Error::QueryRejection(rej) => (rej.status(), InvalidInput(rej.body_text())),
            // Service errors expose the underlying error text as the detail.
            Error::Tees(er) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ServiceError(er.to_string()),
            ),
            Error::Subscribe(er) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ServiceError(er.to_string()),
            ),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::debug!("{:<12} - into_response(Error: {self:?})", "INTO_RESP");

        // Construct a response
        let mut res = StatusCode::INTERNAL_SERVER_ERROR.into_response();

        // Insert the Error into response so that it can be retrieved later.
        res.extensions_mut().insert(Arc::new(self));

        res
    }
}

#[derive(Debug, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientError {
    InvalidInput(String),
    ServiceError(String),
}

impl ClientError {
    pub fn detail(&self) -> &str {
        match self {
            ClientError::InvalidInput(detail) | ClientError::ServiceError(detail) => detail,
        }
    }
}
