//! In-process mock backends shared by the unit tests.

use crate::config::{Api, Config};
use crate::state::AppState;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub type Recorder = Arc<Mutex<Vec<Recorded>>>;

/// Backend answering every path with a fixed status, content type and body,
/// recording what it received.
pub async fn spawn_backend(
    status: StatusCode,
    content_type: &'static str,
    reply: &str,
) -> (String, Recorder) {
    spawn_backend_with_delay(status, content_type, reply, Duration::ZERO).await
}

pub async fn spawn_backend_with_delay(
    status: StatusCode,
    content_type: &'static str,
    reply: &str,
    delay: Duration,
) -> (String, Recorder) {
    let received: Recorder = Arc::new(Mutex::new(Vec::new()));
    let rec = received.clone();
    let reply = reply.to_string();

    let app = Router::new().fallback(move |req: Request<Body>| {
        let rec = rec.clone();
        let reply = reply.clone();
        async move {
            let (parts, body) = req.into_parts();
            let body = hyper::body::to_bytes(body).await.unwrap_or_default();
            rec.lock().await.push(Recorded {
                method: parts.method,
                uri: parts.uri.to_string(),
                headers: parts.headers,
                body,
            });
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            (status, [(header::CONTENT_TYPE, content_type)], reply)
        }
    });

    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let server = axum::Server::from_tcp(listener)
        .expect("server")
        .serve(app.into_make_service());
    tokio::spawn(server);
    (format!("http://127.0.0.1:{}", addr.port()), received)
}

/// A base URL nothing is listening on.
pub fn unreachable_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

pub fn test_config(query: &str, dashboard: &str) -> Config {
    Config {
        listen: None,
        api: Api {
            query: query.to_string(),
            dashboard: dashboard.to_string(),
        },
        database: None,
        timeout_secs: Some(2),
        connect_timeout_secs: None,
        max_request_body_bytes: None,
    }
}

pub fn test_state(query: &str, dashboard: &str) -> AppState {
    AppState::from_config(&test_config(query, dashboard)).expect("state")
}
