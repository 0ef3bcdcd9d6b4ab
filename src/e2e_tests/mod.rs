use std::collections::HashSet;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use httpmock::Method::GET;
use httpmock::MockServer;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

use crate::api::Server;
use crate::config::testdata::test_config;
use crate::config::Config;
use crate::controller::{ExternalHandler, TaskController};
use crate::datastore::HashMapStorage;

const API_KEY: &str = "test-key";

struct TestServer {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    fn start(upstream: Option<Url>) -> Self {
        let mut config = test_config();
        if let Some(url) = upstream {
            config.external.url = url;
        }
        Self::start_with(config)
    }

    fn start_with(config: Config) -> Self {
        let listener = TcpListener::bind(config.listen.addr().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        let controller = TaskController::new(
            Arc::new(HashMapStorage::new()),
            config.auth,
            ExternalHandler::new(&config.external).unwrap(),
        );
        let (stop, stopped) = oneshot::channel::<()>();
        let shutdown = async move {
            let _ = stopped.await;
        };
        let handle = tokio::spawn(Server::new(config.listen, controller).serve(listener, shutdown));
        Self { addr, stop, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn shutdown(self) {
        self.stop.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn test_e2e_task_scenario() {
    let server = TestServer::start(None);
    let c = client();

    // create
    let res = c
        .post(server.url("/tasks"))
        .header("X-API-KEY", API_KEY)
        .header("Content-Type", "application/json")
        .body(r#"{"title":"Write unit tests"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(
        res.json::<Value>().await.unwrap(),
        json!({"id": 1, "title": "Write unit tests", "done": false})
    );

    // mark done
    let res = c
        .patch(server.url("/tasks?id=1"))
        .header("X-API-KEY", API_KEY)
        .body(r#"{"done":true}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"updated": true}));

    // verify
    let res = c
        .get(server.url("/tasks?id=1"))
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.json::<Value>().await.unwrap(),
        json!({"id": 1, "title": "Write unit tests", "done": true})
    );

    // delete
    let res = c
        .delete(server.url("/tasks?id=1"))
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"deleted": true}));

    // gone
    let res = c
        .get(server.url("/tasks?id=1"))
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.shutdown().await;
}

#[tokio::test]
async fn test_e2e_unauthorized() {
    let server = TestServer::start(None);

    let res = client().get(server.url("/tasks")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let rid = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(rid.len(), 32);
    assert_eq!(
        res.json::<Value>().await.unwrap(),
        json!({"error": "unauthorized"})
    );

    let res = client()
        .get(server.url("/external/todos"))
        .header("X-API-KEY", "secret12345")
        .header("X-Request-ID", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["x-request-id"], "trace-me");

    server.shutdown().await;
}

#[tokio::test]
async fn test_e2e_concurrent_creates() {
    let server = TestServer::start(None);
    let c = client();
    let total = 50;

    let requests = (0..total).map(|n| {
        let c = c.clone();
        let url = server.url("/tasks");
        async move {
            let res = c
                .post(url)
                .header("X-API-KEY", API_KEY)
                .body(json!({ "title": format!("task {}", n) }).to_string())
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::CREATED);
            res.json::<Value>().await.unwrap()["id"].as_u64().unwrap()
        }
    });
    let ids: HashSet<u64> = futures::future::join_all(requests)
        .await
        .into_iter()
        .collect();
    assert_eq!(ids, (1..=total).collect::<HashSet<u64>>());

    let listed: Vec<u64> = c
        .get(server.url("/tasks"))
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .unwrap()
        .json::<Vec<Value>>()
        .await
        .unwrap()
        .iter()
        .map(|task| task["id"].as_u64().unwrap())
        .collect();
    assert_eq!(listed, (1..=total).collect::<Vec<u64>>());

    server.shutdown().await;
}

#[tokio::test]
async fn test_e2e_external_todos() {
    let upstream = MockServer::start_async().await;
    let todos = json!([{"userId": 1, "id": 1, "title": "delectus aut autem", "completed": false}]);
    let mock = upstream
        .mock_async(|when, then| {
            when.method(GET).path("/todos");
            then.status(200)
                .header("content-type", "application/json")
                .body(todos.to_string());
        })
        .await;
    let server = TestServer::start(Some(Url::parse(&upstream.url("/todos")).unwrap()));

    let res = client()
        .get(server.url("/external/todos"))
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap(), todos);
    mock.assert_async().await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_e2e_external_unreachable() {
    // test config points the upstream at a closed port
    let server = TestServer::start(None);

    let res = client()
        .get(server.url("/external/todos"))
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        res.json::<Value>().await.unwrap(),
        json!({"error": "external api error"})
    );

    // the process keeps serving
    let res = client()
        .get(server.url("/tasks"))
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    server.shutdown().await;
}

#[tokio::test]
async fn test_e2e_header_read_timeout_closes_connection() {
    let mut config = test_config();
    config.listen.header_read_timeout = Duration::from_millis(200);
    let server = TestServer::start_with(config);
    let addr = server.addr;

    // GIVEN a client that never finishes its request head
    let started = Instant::now();
    let closed = tokio::task::spawn_blocking(move || {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
            .write_all(b"GET /tasks HTTP/1.1\r\nHost: localhost\r\n")
            .unwrap();
        let mut buf = Vec::new();
        match stream.read_to_end(&mut buf) {
            Ok(_) => true,
            Err(err) => !matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut),
        }
    })
    .await
    .unwrap();

    // THEN the server hangs up once the header timeout elapses
    assert!(closed);
    assert!(started.elapsed() < Duration::from_secs(3));

    server.shutdown().await;
}

#[tokio::test]
async fn test_e2e_shutdown_grace_bounds_in_flight_requests() {
    // GIVEN an upstream slower than the grace period
    let upstream = MockServer::start_async().await;
    let mock = upstream
        .mock_async(|when, then| {
            when.method(GET).path("/todos");
            then.status(200)
                .header("content-type", "application/json")
                .body("[]")
                .delay(Duration::from_secs(10));
        })
        .await;
    let mut config = test_config();
    config.listen.shutdown_grace = Duration::from_millis(300);
    config.external.url = Url::parse(&upstream.url("/todos")).unwrap();
    config.external.timeout = Duration::from_secs(30);
    let server = TestServer::start_with(config);

    // AND a request held open by it
    let url = server.url("/external/todos");
    let in_flight = tokio::spawn(async move {
        client()
            .get(url)
            .header("X-API-KEY", API_KEY)
            .send()
            .await
    });
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(mock.hits_async().await, 1);

    // WHEN shutdown is triggered
    let started = Instant::now();
    server.stop.send(()).unwrap();
    let served = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("serve should return once the grace period elapses");

    // THEN serve returns after the grace period instead of waiting for the upstream
    served.unwrap().unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(300), "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "{:?}", elapsed);

    in_flight.abort();
}
