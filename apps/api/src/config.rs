use anyhow::{Context, Result};
use reqwest::Url;

/// Prefix applied to every variable lookup, so several deployments can share one env file.
const ENVIRONMENT_NAME_VAR: &str = "DEPLOY_ENVIRONMENT_NAME";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the FSBid API (CDOClients, bids).
    pub fsbid_api_url: Url,
    /// Root of the tracking programs API (bidder classifications).
    pub tp_api_url: Url,
    /// Root of the cycle positions API (available position counts).
    pub cp_api_url: Url,
    pub upstream_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            fsbid_api_url: require_url("FSBID_API_URL")?,
            tp_api_url: require_url("TP_API_URL")?,
            cp_api_url: require_url("CP_API_URL")?,
            upstream_timeout_secs: delineated_env("UPSTREAM_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse::<u64>()
                .context("UPSTREAM_TIMEOUT_SECS must be a whole number of seconds")?,
            port: delineated_env("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: delineated_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Looks up `{DEPLOY_ENVIRONMENT_NAME}{key}` first, then the bare `key`.
fn delineated_env(key: &str) -> Option<String> {
    let env_name = std::env::var(ENVIRONMENT_NAME_VAR).unwrap_or_default();
    if !env_name.is_empty() {
        if let Ok(value) = std::env::var(format!("{env_name}{key}")) {
            return Some(value);
        }
    }
    std::env::var(key).ok()
}

fn require_env(key: &str) -> Result<String> {
    delineated_env(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn require_url(key: &str) -> Result<Url> {
    let raw = require_env(key)?;
    Url::parse(&raw).with_context(|| format!("'{key}' is not a valid URL: {raw}"))
}
