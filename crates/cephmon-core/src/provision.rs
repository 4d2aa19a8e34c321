//! Agent provisioning collaborator

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// SSH coordinates of a mon host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshTarget {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// A local file and where it must end up on the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSyncPair {
    pub src: PathBuf,
    pub dest: String,
}

/// Everything needed to install or update an agent on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub target: SshTarget,
    /// Files synced before the playbook runs; unchanged files are skipped by
    /// content hash.
    pub files: Vec<FileSyncPair>,
    pub playbook: String,
    pub agent_port: u16,
    pub arguments: BTreeMap<String, String>,
}

/// Pushes agent packages to a host and runs the install playbook.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn deploy(&self, request: DeployRequest) -> Result<()>;
}
