use serde::Deserialize;
use std::fs;

/// Base URLs of the two backends the gateway forwards to.
#[derive(Debug, Deserialize, Clone)]
pub struct Api {
    pub query: String,
    pub dashboard: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub listen: Option<String>,
    pub api: Api,
    // Host inventory store. The /api/alive endpoint is only mounted when this is set.
    pub database: Option<Database>,
    // Per outbound call timeout in seconds. Defaults to 5.
    pub timeout_secs: Option<u64>,
    // Connection timeout in seconds for establishing connections to backends.
    // If not set, uses reqwest's default behavior (no specific connect timeout).
    pub connect_timeout_secs: Option<u64>,
    // Maximum request body size in bytes. Requests exceeding this will return 413 Payload Too Large.
    // If not set, defaults to 5 MB (5_242_880 bytes).
    pub max_request_body_bytes: Option<usize>,
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let cfg_str = fs::read_to_string(path)?;
        Ok(toml::from_str(&cfg_str)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_example_config() {
        let s = fs::read_to_string("config.toml.example").expect("read example config");
        let cfg: Config = toml::from_str(&s).expect("parse example toml");
        assert!(cfg.api.query.starts_with("http://"));
        assert!(cfg.api.dashboard.starts_with("http://"));
        assert!(cfg.database.is_some(), "example config should define a database");
    }

    #[test]
    fn database_section_is_optional() {
        let s = r#"
            [api]
            query = "http://q:9966"
            dashboard = "http://d:8081"
        "#;
        let cfg: Config = toml::from_str(s).expect("parse minimal toml");
        assert!(cfg.database.is_none());
        assert!(cfg.listen.is_none());
        assert!(cfg.timeout_secs.is_none());
    }

    #[test]
    fn missing_api_section_is_rejected() {
        let s = r#"listen = "0.0.0.0:1""#;
        assert!(toml::from_str::<Config>(s).is_err());
    }
}
