use hyper::body::HttpBody;
use hyper::{Body, Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use super::reply;
use crate::datastore::{Filter, TaskDataStore};
use crate::model::{DoneUpdate, NewTask, TaskId};

/// Query parameters of a request, first value wins and empty values count as absent.
struct Query(Vec<(String, String)>);

impl Query {
    fn parse(query: Option<&str>) -> Self {
        let pairs = url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();
        Query(pairs)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

/// Ids are positive and bounded by `i64::MAX`.
fn parse_id(raw: Option<&str>) -> Result<TaskId, ApiError> {
    match raw.map(str::parse::<i64>) {
        Some(Ok(id)) if id > 0 => Ok(id as TaskId),
        _ => Err(ApiError::InvalidId),
    }
}

fn parse_done(raw: &str) -> Result<bool, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ApiError::InvalidDone),
    }
}

const MAX_BODY_BYTES: usize = 1024 * 1024;

async fn read_body(mut body: Body) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk?;
        if bytes.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(ApiError::BodyTooLarge(MAX_BODY_BYTES));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Reads the whole body as a single JSON object; arrays, trailing data and unknown
/// fields fail.
async fn read_json<T: DeserializeOwned>(body: Body) -> Result<T, ApiError> {
    let bytes = read_body(body).await?;
    match serde_json::from_slice::<Value>(&bytes)? {
        object @ Value::Object(_) => Ok(serde_json::from_value(object)?),
        _ => Err(ApiError::NotAnObject),
    }
}

pub struct TaskHandler<D> {
    datastore: Arc<D>,
}

impl<D> TaskHandler<D>
where
    D: TaskDataStore,
{
    pub fn new(datastore: Arc<D>) -> Self {
        Self { datastore }
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        match self.dispatch(req).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    async fn dispatch(&self, req: Request<Body>) -> Result<Response<Body>, ApiError> {
        let query = Query::parse(req.uri().query());
        match *req.method() {
            Method::GET => self.get(&query),
            Method::POST => self.create(req.into_body()).await,
            Method::PATCH => self.update(&query, req.into_body()).await,
            Method::DELETE => self.delete(&query),
            _ => Err(ApiError::MethodNotAllowed),
        }
    }

    fn get(&self, query: &Query) -> Result<Response<Body>, ApiError> {
        if let Some(raw_id) = query.get("id") {
            let id = parse_id(Some(raw_id))?;
            let task = self.datastore.get(id).ok_or(ApiError::TaskNotFound(id))?;
            return Ok(reply::json(StatusCode::OK, &task));
        }

        let filter = match query.get("done") {
            Some(raw_done) => Filter::done(parse_done(raw_done)?),
            None => Filter::default(),
        };
        let tasks = self.datastore.items(&filter);
        Ok(reply::json(StatusCode::OK, &tasks))
    }

    async fn create(&self, body: Body) -> Result<Response<Body>, ApiError> {
        let new_task: NewTask = read_json(body).await?;
        let title = new_task.title()?;
        let task = self.datastore.add(title);
        Ok(reply::json(StatusCode::CREATED, &task))
    }

    async fn update(&self, query: &Query, body: Body) -> Result<Response<Body>, ApiError> {
        let id = parse_id(query.get("id"))?;
        let update: DoneUpdate = read_json(body).await?;
        let done = update.done()?;
        if !self.datastore.update_done(id, done) {
            return Err(ApiError::TaskNotFound(id));
        }
        Ok(reply::json(StatusCode::OK, &json!({ "updated": true })))
    }

    fn delete(&self, query: &Query) -> Result<Response<Body>, ApiError> {
        let id = parse_id(query.get("id"))?;
        if !self.datastore.delete(id) {
            return Err(ApiError::TaskNotFound(id));
        }
        Ok(reply::json(StatusCode::OK, &json!({ "deleted": true })))
    }
}
