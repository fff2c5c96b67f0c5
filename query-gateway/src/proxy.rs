use crate::error::{GatewayError, JSON_UTF8};
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use reqwest::{Client, Url};
use tracing::{debug, error, warn};

/// How the inbound request is replayed against the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    /// GET without a body
    Get,
    /// POST with the body passed through as `application/json`
    Json,
    /// POST with the body passed through as `application/x-www-form-urlencoded`
    Form,
}

impl ForwardMode {
    pub fn method(self) -> Method {
        match self {
            ForwardMode::Get => Method::GET,
            ForwardMode::Json | ForwardMode::Form => Method::POST,
        }
    }

    fn content_type(self) -> Option<&'static str> {
        match self {
            ForwardMode::Get => None,
            ForwardMode::Json => Some("application/json"),
            ForwardMode::Form => Some("application/x-www-form-urlencoded"),
        }
    }
}

// Standard hop-by-hop headers plus the ones the gateway sets or negotiates itself.
const SKIPPED_HEADERS: [&str; 12] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
    "content-type",
    "accept-encoding",
];

fn is_skipped(name: &HeaderName) -> bool {
    SKIPPED_HEADERS.iter().any(|h| name.as_str().eq_ignore_ascii_case(h))
}

/// Issue one outbound request for `target` and relay the backend's status and
/// body. Bodies are fully buffered in both directions.
pub async fn forward(
    client: &Client,
    mode: ForwardMode,
    target: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let url = Url::parse(target).map_err(|e| {
        error!("Invalid backend target '{}': {}", target, e);
        GatewayError::InvalidTarget(target.to_string())
    })?;

    let mut builder = client.request(mode.method(), url);
    for (name, value) in headers.iter() {
        if is_skipped(name) {
            continue;
        }
        builder = builder.header(name, value);
    }
    if let Some(content_type) = mode.content_type() {
        builder = builder.header(header::CONTENT_TYPE, content_type).body(body);
    }

    debug!("Forwarding {:?} request to {}", mode, target);
    let resp = builder.send().await.map_err(|e| {
        error!("Backend request to {} failed: {}", target, e);
        GatewayError::from(e)
    })?;
    let status = resp.status();
    let body = resp.bytes().await.map_err(|e| {
        error!("Reading backend response from {} failed: {}", target, e);
        if e.is_timeout() {
            GatewayError::Timeout(e)
        } else {
            GatewayError::UpstreamBody(e)
        }
    })?;
    if !status.is_success() {
        warn!("Backend {} answered {}", target, status);
    }
    Ok(relay(status, body))
}

/// Backend body verbatim, with the content type forced to JSON regardless of
/// what the backend declared.
pub fn relay(status: StatusCode, body: Bytes) -> Response {
    (status, [(header::CONTENT_TYPE, JSON_UTF8)], body).into_response()
}

// Helper to read the full body with size limit
pub async fn to_bytes(body: &mut Body, max_size: usize) -> Result<Bytes, GatewayError> {
    use axum::body::HttpBody;
    use bytes::BytesMut;

    let mut buf = BytesMut::new();
    let mut total_size: usize = 0;

    while let Some(chunk_res) = body.data().await {
        let chunk = match chunk_res {
            Ok(chunk) => chunk,
            Err(_) => return Err(GatewayError::BodyRead),
        };

        // Check for overflow and size limit
        total_size = match total_size.checked_add(chunk.len()) {
            Some(new_size) if new_size <= max_size => new_size,
            _ => return Err(GatewayError::BodyTooLarge(max_size)),
        };

        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}
