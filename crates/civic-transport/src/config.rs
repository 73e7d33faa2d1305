use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub push_url: String,
    pub token: Option<String>,
    /// Extra attempts for idempotent reads. Mutations are never retried.
    pub read_retries: u32,
    pub retry_backoff: Duration,
    pub push_reconnect: Duration,
}

impl ClientConfig {
    /// Load from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = get("CIVIC_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.into())
            .trim_end_matches('/')
            .to_string();
        let push_url = get("CIVIC_PUSH_URL").unwrap_or_else(|| push_url_for(&api_url));
        let token = get("CIVIC_TOKEN").filter(|t| !t.trim().is_empty());

        let read_retries = get("CIVIC_READ_RETRIES")
            .unwrap_or_else(|| "2".into())
            .parse()
            .context("CIVIC_READ_RETRIES must be a non-negative integer")?;
        let retry_backoff_ms: u64 = get("CIVIC_RETRY_BACKOFF_MS")
            .unwrap_or_else(|| "250".into())
            .parse()
            .context("CIVIC_RETRY_BACKOFF_MS must be milliseconds")?;
        let push_reconnect_ms: u64 = get("CIVIC_PUSH_RECONNECT_MS")
            .unwrap_or_else(|| "2000".into())
            .parse()
            .context("CIVIC_PUSH_RECONNECT_MS must be milliseconds")?;

        Ok(Self {
            api_url,
            push_url,
            token,
            read_retries,
            retry_backoff: Duration::from_millis(retry_backoff_ms),
            push_reconnect: Duration::from_millis(push_reconnect_ms),
        })
    }
}

/// http(s)://host -> ws(s)://host/push
fn push_url_for(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}/push", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}/push", rest)
    } else {
        format!("{}/push", base)
    }
}
