//! Runtime configuration

use crate::error::{MonError, Result};
use crate::mon::MonKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where a kind's agent lives and how it is deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_port: u16,
    pub package_name: String,
    pub playbook_name: String,
    /// Directory on the mon host that receives the synced packages.
    pub remote_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonConfig {
    /// Skip tool check, deployment and echo when connecting. For
    /// environments with no real mon hosts.
    pub bypass_provisioning: bool,
    /// Per-call timeout for agent HTTP requests.
    pub agent_timeout_ms: u64,
    /// Executables that must be on `PATH` before deploying.
    pub required_tools: Vec<String>,
    /// Local path of the shared agent library archive.
    pub shared_lib_package: PathBuf,
    /// Local directory holding the per-kind agent packages.
    pub package_dir: PathBuf,
    pub backup_storage: AgentProfile,
    pub primary_storage: AgentProfile,
}

impl Default for MonConfig {
    fn default() -> Self {
        Self {
            bypass_provisioning: false,
            agent_timeout_ms: 30_000,
            required_tools: vec!["sshpass".to_string()],
            shared_lib_package: PathBuf::from("ansible/files/zstacklib.tar.gz"),
            package_dir: PathBuf::from("ansible"),
            backup_storage: AgentProfile {
                agent_port: 7761,
                package_name: "cephbackupstorage.tar.gz".to_string(),
                playbook_name: "cephb.py".to_string(),
                remote_dir: "/var/lib/zstack/cephb".to_string(),
            },
            primary_storage: AgentProfile {
                agent_port: 7762,
                package_name: "cephprimarystorage.tar.gz".to_string(),
                playbook_name: "cephp.py".to_string(),
                remote_dir: "/var/lib/zstack/cephp".to_string(),
            },
        }
    }
}

impl MonConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: MonConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent_timeout_ms == 0 {
            return Err(MonError::Config {
                reason: "agent_timeout_ms must be positive".to_string(),
            });
        }
        for (kind, profile) in [
            (MonKind::BackupStorage, &self.backup_storage),
            (MonKind::PrimaryStorage, &self.primary_storage),
        ] {
            if profile.agent_port == 0 {
                return Err(MonError::Config {
                    reason: format!("{kind} agent_port must be positive"),
                });
            }
        }
        Ok(())
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_timeout_ms)
    }

    pub fn profile(&self, kind: MonKind) -> &AgentProfile {
        match kind {
            MonKind::BackupStorage => &self.backup_storage,
            MonKind::PrimaryStorage => &self.primary_storage,
        }
    }

    /// Local path of a kind's agent package.
    pub fn package_path(&self, kind: MonKind) -> PathBuf {
        self.package_dir.join(&self.profile(kind).package_name)
    }
}
