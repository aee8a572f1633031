#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::extract::Extension;
use axum::http::{Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use tokio::task::JoinHandle;

/// Requests seen by a fixture server, as "METHOD /path".
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub calls: CallLog,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record(Extension(calls): Extension<CallLog>, method: Method, uri: Uri) -> StatusCode {
    calls.lock().unwrap().push(format!("{} {}", method, uri.path()));
    StatusCode::OK
}

async fn hello(Extension(calls): Extension<CallLog>) -> impl IntoResponse {
    calls.lock().unwrap().push("GET /hello".to_string());
    Json(serde_json::json!({ "name": "Double Belomor" }))
}

async fn missing(Extension(calls): Extension<CallLog>, uri: Uri) -> StatusCode {
    calls.lock().unwrap().push(format!("GET {}", uri.path()));
    StatusCode::NOT_FOUND
}

/// Serves /a (GET), /b (PUT), /c (DELETE), /hello (GET, JSON) and /missing (404).
pub async fn start_server() -> TestServer {
    let calls: CallLog = Arc::default();
    let app = Router::new()
        .route("/a", get(record))
        .route("/b", put(record))
        .route("/c", delete(record))
        .route("/hello", get(hello))
        .route("/missing", get(missing))
        .layer(Extension(calls.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        addr,
        calls,
        handle,
    }
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Plain hyper server on a Unix socket that echoes "METHOD /path".
#[cfg(unix)]
pub fn start_unix_server(path: &Path) -> JoinHandle<()> {
    use bytes::Bytes;
    use http_body_util::Full;
    use hyper::body::Incoming;
    use hyper::service::service_fn;
    use hyper_util::rt::TokioIo;

    let listener = tokio::net::UnixListener::bind(path).unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let service = service_fn(|req: hyper::Request<Incoming>| async move {
                    let body = format!("{} {}", req.method(), req.uri().path());
                    Ok::<_, Infallible>(hyper::Response::new(Full::new(Bytes::from(body))))
                });
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    })
}
