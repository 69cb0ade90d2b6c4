#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;

use gtr_submit::api::ApiClient;
use gtr_submit::config::Config;

/// One request as the fake registry saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the query string.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body is not JSON")
    }
}

type Responder = dyn Fn(&RecordedRequest) -> (u16, String) + Send + Sync;

/// A local stand-in for the submission portal listening on a random port.
pub struct FakeRegistry {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeRegistry {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn config(&self) -> Config {
        Config {
            api_key: "test-key".to_string(),
            base_url: self.url(),
            timeout: Some(Duration::from_secs(10)),
            log_level: "warn".to_string(),
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.config()).expect("failed to build client")
    }
}

#[derive(Clone)]
struct RegistryState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    respond: Arc<Responder>,
}

/// Spawn a registry answering every request with `respond`. The server runs
/// on its own runtime thread so the blocking client can call it directly.
pub fn spawn_registry<F>(respond: F) -> FakeRegistry
where
    F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    listener
        .set_nonblocking(true)
        .expect("Failed to make listener non-blocking");
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let state = RegistryState {
        requests: Arc::clone(&requests),
        respond: Arc::new(respond),
    };
    let app = Router::new().fallback(record).with_state(state);

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to build test runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener)
                .expect("Failed to register listener");
            axum::serve(listener, app).await.expect("Server failed");
        });
    });

    FakeRegistry { addr, requests }
}

/// Registry that accepts everything with `201` and a small JSON body.
pub fn spawn_accepting_registry() -> FakeRegistry {
    spawn_registry(|_| (201, r#"{"id":"SUB100"}"#.to_string()))
}

async fn record(
    State(state): State<RegistryState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = match String::from_utf8(body.to_vec()) {
        Ok(body) => body,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("fake registry: request body is not UTF-8: {e}"),
            )
                .into_response()
        }
    };

    let request = RecordedRequest {
        method: method.to_string(),
        path: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        headers: headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        body,
    };

    let (status, text) = (state.respond)(&request);
    match state.requests.lock() {
        Ok(mut seen) => seen.push(request),
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "fake registry: request log poisoned".to_string(),
            )
                .into_response()
        }
    }

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], text).into_response()
}

/// Address nothing listens on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Temporary directory for input files, removed on drop.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Self {
        Scratch {
            dir: TempDir::new().expect("Failed to create scratch dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("Failed to write scratch file");
        path
    }
}

/// Split captured stdout into parsed JSON lines.
pub fn json_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("output line is not JSON"))
        .collect()
}
