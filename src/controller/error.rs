use hyper::{Body, Response, StatusCode};
use serde_derive::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use super::reply;
use crate::model::{ModelError, TaskId};

// Errors surfaced to HTTP clients. The display string is the stable `error` message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid id")]
    InvalidId,
    #[error("invalid done")]
    InvalidDone,
    #[error("invalid json")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid json")]
    UnreadableBody(#[from] hyper::Error),
    #[error("invalid json")]
    NotAnObject,
    #[error("request body too large")]
    BodyTooLarge(usize),
    #[error("invalid title")]
    InvalidTitle(#[source] ModelError),
    #[error("task not found")]
    TaskNotFound(TaskId),
    #[error("not found")]
    RouteNotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("unauthorized")]
    Unauthorized,
    #[error("external api error")]
    Upstream(#[from] reqwest::Error),
    #[error("external api error")]
    UpstreamStatus(StatusCode),
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidTitle(_) => ApiError::InvalidTitle(err),
            ModelError::MissingDone => ApiError::InvalidDone,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidId
            | ApiError::InvalidDone
            | ApiError::InvalidJson(_)
            | ApiError::UnreadableBody(_)
            | ApiError::NotAnObject
            | ApiError::InvalidTitle(_) => StatusCode::BAD_REQUEST,
            ApiError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::TaskNotFound(_) | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) | ApiError::UpstreamStatus(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn into_response(self) -> Response<Body> {
        match &self {
            ApiError::Upstream(err) => error!(reason = %err, "External api call failed."),
            ApiError::UpstreamStatus(status) => {
                error!(status = %status, "External api answered with an error status.")
            }
            ApiError::InvalidJson(err) => debug!(reason = %err, "Rejected request body."),
            ApiError::InvalidTitle(err) => debug!(reason = %err, "Rejected request body."),
            other => debug!(error = %other, "Request failed."),
        }
        reply::json(
            self.status(),
            &ErrorBody {
                error: self.to_string(),
            },
        )
    }
}
