mod error;
mod external;
mod middleware;
mod reply;
mod tasks;

use std::sync::Arc;

use hyper::{Body, Request, Response};
use tracing::{info_span, Instrument};

pub use error::ApiError;
pub use external::ExternalHandler;
pub use tasks::TaskHandler;

use crate::config::Auth;
use crate::datastore::TaskDataStore;
use crate::model::RequestId;

pub const TASKS_PATH: &str = "/tasks";
pub const EXTERNAL_TODOS_PATH: &str = "/external/todos";

/// Routes requests to the handlers, wrapped in request-id, logging and api-key checks.
pub struct TaskController<D>
where
    D: TaskDataStore,
{
    auth: Auth,
    tasks: TaskHandler<D>,
    external: ExternalHandler,
}

impl<D> TaskController<D>
where
    D: TaskDataStore,
{
    pub fn new(datastore: Arc<D>, auth: Auth, external: ExternalHandler) -> Self {
        Self {
            auth,
            tasks: TaskHandler::new(datastore),
            external,
        }
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let request_id = RequestId::from_header_map_or_generate(req.headers());
        let span = info_span!("request", request_id = request_id.as_str());
        let mut response = self.logged(req).instrument(span).await;
        middleware::stamp_request_id(&request_id, &mut response);
        response
    }

    async fn logged(&self, req: Request<Body>) -> Response<Body> {
        middleware::log_request(&req, &self.auth.log_message);
        if let Err(err) = middleware::authorize(&req, &self.auth.api_key) {
            return err.into_response();
        }
        self.route(req).await
    }

    async fn route(&self, req: Request<Body>) -> Response<Body> {
        match req.uri().path() {
            TASKS_PATH => self.tasks.handle(req).await,
            EXTERNAL_TODOS_PATH => self.external.handle(req).await,
            _ => ApiError::RouteNotFound.into_response(),
        }
    }
}
