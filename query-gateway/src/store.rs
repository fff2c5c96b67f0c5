//! Read-only access to the host inventory.

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tracing::debug;

use crate::config::Database;

/// A registered host as recorded in the inventory `host` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Host {
    pub hostname: String,
    pub agent_version: String,
}

/// Source of host records. Implementations never write.
#[async_trait]
pub trait HostStore: Send + Sync {
    /// All hosts, ordered by hostname ascending.
    async fn list_hosts(&self) -> anyhow::Result<Vec<Host>>;
}

/// MySQL backed host store
pub struct MySqlHostStore {
    pool: MySqlPool,
}

impl MySqlHostStore {
    /// Build the store with a lazily connecting pool, so the gateway starts even
    /// when the database is briefly unavailable. Waiting for a connection is
    /// bounded by `timeout`.
    pub fn connect_lazy(db: &Database, timeout: Duration) -> anyhow::Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(db.max_connections.unwrap_or(4))
            .acquire_timeout(timeout)
            .connect_lazy(&db.url)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl HostStore for MySqlHostStore {
    async fn list_hosts(&self) -> anyhow::Result<Vec<Host>> {
        let hosts = sqlx::query_as::<_, Host>(
            "SELECT hostname, agent_version FROM host ORDER BY hostname ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        debug!("Loaded {} host(s) from inventory", hosts.len());
        Ok(hosts)
    }
}
