//! Flows of the connect chain

use agent_client::AgentClient;
use async_trait::async_trait;
use cephmon_core::{DeployRequest, MonError, Provisioner, Result};
use flow_engine::{Flow, FlowData};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Tools from `required` that cannot be found on `PATH`.
pub fn missing_tools(required: &[String]) -> Vec<String> {
    let dirs: Vec<PathBuf> = env::var_os("PATH")
        .map(|path| env::split_paths(&path).collect())
        .unwrap_or_default();

    required
        .iter()
        .filter(|tool| !is_available(tool, &dirs))
        .cloned()
        .collect()
}

fn is_available(tool: &str, dirs: &[PathBuf]) -> bool {
    if tool.contains(std::path::MAIN_SEPARATOR) {
        return is_executable(Path::new(tool));
    }
    dirs.iter().any(|dir| is_executable(&dir.join(tool)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Fails when any required executable is missing on this host.
#[derive(Debug, Clone)]
pub struct CheckToolsFlow {
    tools: Vec<String>,
}

impl CheckToolsFlow {
    pub fn new(tools: Vec<String>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Flow for CheckToolsFlow {
    fn name(&self) -> &str {
        "check-tools"
    }

    async fn run(&self, _data: &FlowData) -> Result<()> {
        let missing = missing_tools(&self.tools);
        if !missing.is_empty() {
            return Err(MonError::MissingTools {
                tools: missing.join(", "),
            });
        }
        debug!(tools = ?self.tools, "required tools present");
        Ok(())
    }
}

/// Syncs the agent packages to the mon and runs the install playbook.
pub struct DeployAgentFlow {
    provisioner: Arc<dyn Provisioner>,
    request: DeployRequest,
}

impl DeployAgentFlow {
    pub fn new(provisioner: Arc<dyn Provisioner>, request: DeployRequest) -> Self {
        Self {
            provisioner,
            request,
        }
    }
}

#[async_trait]
impl Flow for DeployAgentFlow {
    fn name(&self) -> &str {
        "deploy-agent"
    }

    async fn run(&self, _data: &FlowData) -> Result<()> {
        self.provisioner.deploy(self.request.clone()).await?;
        info!(
            hostname = %self.request.target.hostname,
            playbook = %self.request.playbook,
            "agent deployed"
        );
        Ok(())
    }
}

/// Confirms the freshly deployed agent answers.
pub struct EchoAgentFlow {
    agent: AgentClient,
    hostname: String,
    port: u16,
    path: &'static str,
}

impl EchoAgentFlow {
    pub fn new(agent: AgentClient, hostname: impl Into<String>, port: u16, path: &'static str) -> Self {
        Self {
            agent,
            hostname: hostname.into(),
            port,
            path,
        }
    }
}

#[async_trait]
impl Flow for EchoAgentFlow {
    fn name(&self) -> &str {
        "echo-agent"
    }

    async fn run(&self, _data: &FlowData) -> Result<()> {
        self.agent.echo(&self.hostname, self.port, self.path).await
    }
}
