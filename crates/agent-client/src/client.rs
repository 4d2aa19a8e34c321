//! Typed agent calls

use crate::command::AgentResponse;
use crate::transport::{AgentTransport, HttpTransport};
use cephmon_core::{MonConfig, MonError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct AgentClient {
    transport: Arc<dyn AgentTransport>,
    timeout: Duration,
}

impl fmt::Debug for AgentClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentClient")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AgentClient {
    pub fn new(transport: Arc<dyn AgentTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Client speaking real HTTP with the configured per-call timeout.
    pub fn from_config(config: &MonConfig) -> Self {
        Self::new(Arc::new(HttpTransport::new()), config.agent_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `http://<hostname>:<port><path>`, rejecting an empty host or port 0.
    pub fn agent_url(hostname: &str, port: u16, path: &str) -> Result<String> {
        if hostname.trim().is_empty() {
            return Err(MonError::InvalidEndpoint {
                reason: "hostname is empty".to_string(),
            });
        }
        if port == 0 {
            return Err(MonError::InvalidEndpoint {
                reason: format!("agent port of {hostname} is 0"),
            });
        }
        Ok(format!("http://{hostname}:{port}{path}"))
    }

    /// Send `cmd` to `path` on the agent and decode the reply as `R`.
    ///
    /// A reply that decodes is returned even when it reports `success =
    /// false`; interpreting logical failures is up to the caller.
    #[instrument(skip(self, cmd), fields(timeout_ms = self.timeout.as_millis() as u64))]
    pub async fn call<C, R>(&self, hostname: &str, port: u16, path: &str, cmd: &C) -> Result<R>
    where
        C: Serialize + Sync,
        R: AgentResponse + DeserializeOwned,
    {
        let url = Self::agent_url(hostname, port, path)?;
        let body = serde_json::to_value(cmd)?;
        let raw = self.transport.post_json(&url, body, self.timeout).await?;
        let rsp: R = serde_json::from_value(raw).map_err(|e| MonError::Decode {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        rsp.check()?;
        debug!(%url, success = rsp.success(), "agent call returned");
        Ok(rsp)
    }

    /// Liveness check against a freshly deployed agent.
    #[instrument(skip(self))]
    pub async fn echo(&self, hostname: &str, port: u16, path: &str) -> Result<()> {
        let url = Self::agent_url(hostname, port, path)?;
        self.transport.echo(&url, self.timeout).await
    }
}
