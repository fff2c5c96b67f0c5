use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub const JSON_UTF8: &str = "application/json; charset=UTF-8";

/// Failures the gateway itself reports. A backend that answers with an error
/// status is not one of these: its response is relayed as is.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("failed to read request body")]
    BodyRead,

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("invalid backend target '{0}'")]
    InvalidTarget(String),

    #[error("backend request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("backend unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("failed to read backend response: {0}")]
    UpstreamBody(#[source] reqwest::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::BodyRead => StatusCode::BAD_REQUEST,
            GatewayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::InvalidTarget(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Unreachable(_) | GatewayError::UpstreamBody(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::BodyTooLarge(_) => "payload_too_large",
            GatewayError::BodyRead => "bad_request",
            GatewayError::MethodNotAllowed(_) => "method_not_allowed",
            GatewayError::InvalidTarget(_) => "invalid_target",
            GatewayError::Timeout(_) => "gateway_timeout",
            GatewayError::Unreachable(_) | GatewayError::UpstreamBody(_) => "bad_gateway",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout(e)
        } else {
            GatewayError::Unreachable(e)
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.kind(), "message": self.to_string() });
        (
            self.status(),
            [(header::CONTENT_TYPE, JSON_UTF8)],
            body.to_string(),
        )
            .into_response()
    }
}
