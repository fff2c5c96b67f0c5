//! Joins the local host inventory with the query service's last-value API to
//! report agent liveness.
//!
//! Every failure is recorded in the returned [`AliveReport`] and the join goes
//! as far as it can; nothing here aborts the request.

use crate::error::JSON_UTF8;
use crate::state::AppState;
use crate::store::HostStore;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const ALIVE_COUNTER: &str = "agent.alive";

/// One `(endpoint, counter)` pair for the last-value API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastQuery {
    pub endpoint: String,
    pub counter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastValue {
    pub timestamp: i64,
    /// `null` when the backend has no finite value
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastResponse {
    pub endpoint: String,
    pub counter: String,
    #[serde(default)]
    pub value: Option<LastValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Store,
    Encode,
    Request,
    Status,
    Decode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryError {
    pub stage: Stage,
    pub message: String,
}

/// Partial data plus whatever went wrong producing it.
#[derive(Debug, Default, Serialize)]
pub struct AliveReport {
    pub hostnames: Vec<String>,
    pub versions: BTreeMap<String, String>,
    pub data: Vec<LastResponse>,
    pub errors: Vec<InventoryError>,
}

impl AliveReport {
    fn record(&mut self, stage: Stage, err: impl Display) {
        warn!("Agent alive join failed at {:?}: {}", stage, err);
        self.errors.push(InventoryError {
            stage,
            message: err.to_string(),
        });
    }
}

/// Agent hosts follow the `<role>-<n>` naming convention: a hyphen and no domain part.
pub fn is_agent_host(hostname: &str) -> bool {
    hostname.contains('-') && !hostname.contains('.')
}

pub async fn agent_alive(
    client: &Client,
    store: &dyn HostStore,
    query_base: &str,
    timeout: Duration,
) -> AliveReport {
    let mut report = AliveReport::default();
    join(&mut report, client, store, query_base, timeout).await;
    info!(
        "Agent alive join: {} host(s), {} record(s), {} error(s)",
        report.hostnames.len(),
        report.data.len(),
        report.errors.len()
    );
    report
}

// Each stage depends on the previous one; a failed stage is recorded and ends the join.
async fn join(
    report: &mut AliveReport,
    client: &Client,
    store: &dyn HostStore,
    query_base: &str,
    timeout: Duration,
) {
    let mut queries = Vec::new();

    match tokio::time::timeout(timeout, store.list_hosts()).await {
        Ok(Ok(hosts)) => {
            for host in hosts.into_iter().filter(|h| is_agent_host(&h.hostname)) {
                queries.push(LastQuery {
                    endpoint: host.hostname.clone(),
                    counter: ALIVE_COUNTER.to_string(),
                });
                report.versions.insert(host.hostname.clone(), host.agent_version);
                report.hostnames.push(host.hostname);
            }
        }
        Ok(Err(e)) => report.record(Stage::Store, e),
        Err(_) => report.record(
            Stage::Store,
            format!("host query timed out after {:?}", timeout),
        ),
    }

    if queries.is_empty() {
        debug!("No agent hosts selected, skipping last-value query");
        return;
    }

    let body = match serde_json::to_vec(&queries) {
        Ok(b) => b,
        Err(e) => return report.record(Stage::Encode, e),
    };

    let url = format!("{}/graph/last", query_base);
    let resp = match client
        .post(&url)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => return report.record(Stage::Request, e),
    };

    let status = resp.status();
    let bytes = match resp.bytes().await {
        Ok(b) => b,
        Err(e) => return report.record(Stage::Request, e),
    };
    if !status.is_success() {
        return report.record(Stage::Status, format!("{} answered {}", url, status));
    }

    match serde_json::from_slice::<Vec<LastResponse>>(&bytes) {
        Ok(data) => report.data = data,
        Err(e) => report.record(Stage::Decode, e),
    }
}

pub async fn agent_alive_handler(state: Arc<AppState>, store: Arc<dyn HostStore>) -> Response {
    let report = agent_alive(&state.client, store.as_ref(), &state.query_base, state.timeout).await;
    (StatusCode::OK, [(header::CONTENT_TYPE, JSON_UTF8)], Json(report)).into_response()
}
