use async_trait::async_trait;
use reqwest::Proxy;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::debug;

use super::{error_class_for_status, ChatTransport};
use crate::drivers::DriverRequest;
use crate::{Error, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_ERROR_BODY_CHARS: usize = 512;

/// reqwest-backed [`ChatTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, proxy_url: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(
                env::var("AI_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            );

        if let Some(proxy_url) = proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(TransportError::Http)?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client })
    }

    /// Build from `AI_HTTP_TIMEOUT_SECS` (or `AI_TIMEOUT_SECS`) and `AI_PROXY_URL`.
    pub fn from_env() -> Result<Self> {
        let proxy = env::var("AI_PROXY_URL").ok().filter(|s| !s.trim().is_empty());
        Self::new(Duration::from_secs(timeout_secs_from_env()), proxy.as_deref())
    }
}

pub(crate) fn timeout_secs_from_env() -> u64 {
    env::var("AI_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .or_else(|| env::var("AI_TIMEOUT_SECS").ok().and_then(|s| s.parse::<u64>().ok()))
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
}

/// Best-effort error message from a vendor error body.
fn remote_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        let err = json.get("error")?;
        match err {
            Value::String(s) => Some(s.clone()),
            other => other.get("message").and_then(|m| m.as_str()).map(String::from),
        }
    });
    from_json.unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY_CHARS).collect())
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &DriverRequest) -> Result<Value> {
        let mut req = self.client.post(&request.url).json(&request.body);
        for (k, v) in &request.headers {
            req = req.header(k, v);
        }

        let response = req.send().await.map_err(TransportError::Http)?;
        let status = response.status();
        debug!(url = %request.url, status = status.as_u16(), "vendor response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote {
                status: status.as_u16(),
                class: error_class_for_status(status.as_u16()).to_string(),
                message: remote_message(&body),
            });
        }

        let json = response.json().await.map_err(TransportError::Http)?;
        Ok(json)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
