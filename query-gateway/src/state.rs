use crate::config::Config;
use crate::store::{HostStore, MySqlHostStore};
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct AppState {
    pub client: Client,
    /// Query service base URL, without trailing slash
    pub query_base: String,
    /// Dashboard service base URL, without trailing slash
    pub dashboard_base: String,
    pub max_request_body_bytes: usize,
    /// Upper bound for any single outbound call, HTTP or database
    pub timeout: Duration,
    pub hosts: Option<Arc<dyn HostStore>>,
}

impl AppState {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(5));
        let mut builder = Client::builder().timeout(timeout);
        if let Some(secs) = cfg.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;
        debug!("HTTP client created with timeout: {:?}", timeout);

        let query_base = validate_base("query", &cfg.api.query)?;
        let dashboard_base = validate_base("dashboard", &cfg.api.dashboard)?;

        // Default to 5 MB if not specified
        const DEFAULT_MAX_BODY_BYTES: usize = 5_242_880;
        let max_request_body_bytes = cfg.max_request_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
        debug!("Maximum request body size: {} bytes", max_request_body_bytes);

        let hosts = match &cfg.database {
            Some(db) => {
                let store: Arc<dyn HostStore> = Arc::new(MySqlHostStore::connect_lazy(db, timeout)?);
                info!("Host inventory store configured");
                Some(store)
            }
            None => {
                debug!("No database configured, host inventory disabled");
                None
            }
        };

        Ok(AppState {
            client,
            query_base,
            dashboard_base,
            max_request_body_bytes,
            timeout,
            hosts,
        })
    }

    /// Swap in a different host store. Used by tests to avoid a real database.
    #[cfg(test)]
    pub fn with_hosts(mut self, hosts: Arc<dyn HostStore>) -> Self {
        self.hosts = Some(hosts);
        self
    }
}

// Parse and validate a backend base URL at startup; targets are later built by
// plain concatenation so the trailing slash is dropped here.
fn validate_base(name: &str, raw: &str) -> anyhow::Result<String> {
    Url::parse(raw).map_err(|e| anyhow::anyhow!("Invalid {} base URL '{}': {}", name, raw, e))?;
    let base = raw.trim_end_matches('/').to_string();
    info!("Registered {} backend: url='{}'", name, base);
    Ok(base)
}
