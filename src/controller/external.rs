use hyper::{Body, Method, Request, Response, StatusCode};
use url::Url;

use super::error::ApiError;
use super::reply;
use crate::config::External;

/// Relays the configured upstream todo list to the caller.
pub struct ExternalHandler {
    client: reqwest::Client,
    url: Url,
}

impl ExternalHandler {
    pub fn new(config: &External) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        if *req.method() != Method::GET {
            return ApiError::MethodNotAllowed.into_response();
        }
        match self.fetch().await {
            Ok(payload) => reply::json(StatusCode::OK, &payload),
            Err(err) => err.into_response(),
        }
    }

    async fn fetch(&self) -> Result<serde_json::Value, ApiError> {
        let response = self.client.get(self.url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::UpstreamStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}
