//! HTTP transport to mon agents

use async_trait::async_trait;
use cephmon_core::{MonError, Result};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Moves JSON bodies to and from an agent URL.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// POST `body` and return the decoded JSON reply.
    async fn post_json(&self, url: &str, body: Value, timeout: Duration) -> Result<Value>;

    /// Succeeds when the agent answers the echo path with a 2xx status.
    async fn echo(&self, url: &str, timeout: Duration) -> Result<()>;
}

/// [`AgentTransport`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn post(&self, url: &str, body: &Value, timeout: Duration) -> Result<reqwest::Response> {
        let rsp = self
            .client
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| send_error(url, timeout, e))?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(MonError::Transport {
                url: url.to_string(),
                reason: format!("agent answered with HTTP {status}"),
            });
        }
        Ok(rsp)
    }
}

fn send_error(url: &str, timeout: Duration, err: reqwest::Error) -> MonError {
    if err.is_timeout() {
        MonError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        MonError::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl AgentTransport for HttpTransport {
    async fn post_json(&self, url: &str, body: Value, timeout: Duration) -> Result<Value> {
        let rsp = self.post(url, &body, timeout).await?;
        rsp.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                send_error(url, timeout, e)
            } else {
                MonError::Decode {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })
    }

    async fn echo(&self, url: &str, timeout: Duration) -> Result<()> {
        self.post(url, &json!({}), timeout).await?;
        debug!(%url, "agent echoed");
        Ok(())
    }
}
