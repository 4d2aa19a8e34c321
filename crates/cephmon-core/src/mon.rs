//! Mon node records and status

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Connection status of a mon node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for MonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonStatus::Disconnected => "Disconnected",
            MonStatus::Connecting => "Connecting",
            MonStatus::Connected => "Connected",
        };
        f.write_str(s)
    }
}

/// Which storage a mon serves. Selects the agent paths, package and
/// serialization signature used for the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonKind {
    BackupStorage,
    PrimaryStorage,
}

impl MonKind {
    /// Short label used in workflow names, e.g. `backup-storage`.
    pub fn label(&self) -> &'static str {
        match self {
            MonKind::BackupStorage => "backup-storage",
            MonKind::PrimaryStorage => "primary-storage",
        }
    }
}

impl fmt::Display for MonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A persisted mon node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonRecord {
    pub uuid: String,
    pub kind: MonKind,
    /// UUID of the backup or primary storage owning this mon.
    pub storage_uuid: String,
    pub hostname: String,
    pub ssh_username: String,
    pub ssh_password: String,
    pub ssh_port: u16,
    pub agent_port: u16,
    pub status: MonStatus,
}

impl MonRecord {
    /// New disconnected record with a fresh UUID and the default SSH port.
    pub fn new(
        kind: MonKind,
        storage_uuid: impl Into<String>,
        hostname: impl Into<String>,
        agent_port: u16,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4().simple().to_string(),
            kind,
            storage_uuid: storage_uuid.into(),
            hostname: hostname.into(),
            ssh_username: "root".to_string(),
            ssh_password: String::new(),
            ssh_port: 22,
            agent_port,
            status: MonStatus::Disconnected,
        }
    }

    pub fn with_ssh(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        port: u16,
    ) -> Self {
        self.ssh_username = username.into();
        self.ssh_password = password.into();
        self.ssh_port = port;
        self
    }
}

/// Outcome of a health-check ping.
///
/// A ping that reached the agent always produces a `PingResult`, even when
/// the agent reports the mon unhealthy; only transport problems surface as
/// errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResult {
    pub success: bool,
    pub error: Option<String>,
    pub operation_failure: bool,
}

impl PingResult {
    pub fn healthy() -> Self {
        Self {
            success: true,
            error: None,
            operation_failure: false,
        }
    }

    pub fn unhealthy(error: Option<String>, operation_failure: bool) -> Self {
        Self {
            success: false,
            error,
            operation_failure,
        }
    }
}
