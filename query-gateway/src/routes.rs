//! Static route table: inbound path to forwarding mode and backend target.

use crate::error::GatewayError;
use crate::inventory::agent_alive_handler;
use crate::proxy::{forward, to_bytes, ForwardMode};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, Uri},
    response::{IntoResponse, Response},
    routing::{get, on, MethodFilter},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Query,
    Dashboard,
}

/// What gets appended to the backend base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A fixed path
    Suffix(&'static str),
    /// The inbound path and query string, as normalized by the URL parser
    RequestUri,
}

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub path: &'static str,
    pub mode: ForwardMode,
    pub backend: Backend,
    pub target: Target,
}

pub const ROUTES: [Route; 5] = [
    Route {
        path: "/api/info",
        mode: ForwardMode::Json,
        backend: Backend::Query,
        target: Target::Suffix("/graph/info"),
    },
    Route {
        path: "/api/history",
        mode: ForwardMode::Json,
        backend: Backend::Query,
        target: Target::Suffix("/graph/history"),
    },
    Route {
        path: "/api/endpoints",
        mode: ForwardMode::Get,
        backend: Backend::Dashboard,
        target: Target::RequestUri,
    },
    Route {
        path: "/api/counters",
        mode: ForwardMode::Form,
        backend: Backend::Dashboard,
        target: Target::Suffix("/api/counters"),
    },
    Route {
        path: "/api/chart",
        mode: ForwardMode::Form,
        backend: Backend::Dashboard,
        target: Target::Suffix("/chart"),
    },
];

impl Route {
    /// Full backend URL for an inbound request to this route.
    pub fn resolve(&self, state: &AppState, uri: &Uri) -> String {
        let base = match self.backend {
            Backend::Query => &state.query_base,
            Backend::Dashboard => &state.dashboard_base,
        };
        match self.target {
            Target::Suffix(suffix) => format!("{}{}", base, suffix),
            Target::RequestUri => {
                let path_and_query = uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or_else(|| uri.path());
                format!("{}{}", base, path_and_query)
            }
        }
    }

    fn method_filter(&self) -> MethodFilter {
        match self.mode {
            ForwardMode::Get => MethodFilter::GET,
            ForwardMode::Json | ForwardMode::Form => MethodFilter::POST,
        }
    }
}

async fn forward_route(state: Arc<AppState>, route: Route, req: Request<Body>) -> Response {
    debug!("Received {} request", route.path);
    let target = route.resolve(&state, req.uri());
    let (parts, mut body) = req.into_parts();

    let body_bytes = match route.mode {
        ForwardMode::Get => bytes::Bytes::new(),
        ForwardMode::Json | ForwardMode::Form => {
            match to_bytes(&mut body, state.max_request_body_bytes).await {
                Ok(b) => b,
                Err(e) => {
                    debug!("Failed to read request body: {}", e);
                    return e.into_response();
                }
            }
        }
    };

    match forward(&state.client, route.mode, &target, &parts.headers, body_bytes).await {
        Ok(resp) => resp,
        Err(e) => e.into_response(),
    }
}

async fn method_not_allowed(method: Method) -> Response {
    GatewayError::MethodNotAllowed(method).into_response()
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new().route("/health", get(health_handler));

    for route in ROUTES {
        app = app.route(
            route.path,
            on(
                route.method_filter(),
                move |State(state): State<Arc<AppState>>, req: Request<Body>| {
                    forward_route(state, route, req)
                },
            )
            .fallback(method_not_allowed),
        );
        info!("Registered route {} ({:?})", route.path, route.mode);
    }

    if let Some(store) = state.hosts.clone() {
        app = app.route(
            "/api/alive",
            get(move |State(state): State<Arc<AppState>>| {
                agent_alive_handler(state, store.clone())
            }),
        );
        info!("Registered route /api/alive");
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
