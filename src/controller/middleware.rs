use hyper::{Body, Request, Response};
use tracing::{info, warn};

use super::error::ApiError;
use crate::model::RequestId;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests whose `X-API-KEY` header is missing or differs from `api_key`.
pub fn authorize(req: &Request<Body>, api_key: &str) -> Result<(), ApiError> {
    match req.headers().get(API_KEY_HEADER) {
        Some(key) if !key.is_empty() && key.as_bytes() == api_key.as_bytes() => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

/// Access log line: method, path with query, and the configured label.
pub fn log_request(req: &Request<Body>, label: &str) {
    let endpoint = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.uri().path());
    info!(method = %req.method(), endpoint, "{}", label);
}

pub fn stamp_request_id(request_id: &RequestId, response: &mut Response<Body>) {
    if let Err(err) = request_id.insert_into_header_map(response.headers_mut()) {
        warn!(reason = %err, "Unable to set request-id header.");
    }
}
