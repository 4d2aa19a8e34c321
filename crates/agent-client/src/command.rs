//! Agent command and response envelopes

use cephmon_core::{MonError, MonKind, MonRecord, PingResult, Result};
use serde::{Deserialize, Serialize};

/// Fields every agent command carries. Only the key of the owning storage
/// is put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCmd {
    pub mon_uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_storage_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_storage_uuid: Option<String>,
}

impl AgentCmd {
    pub fn for_mon(mon: &MonRecord) -> Self {
        let (backup_storage_uuid, primary_storage_uuid) = match mon.kind {
            MonKind::BackupStorage => (Some(mon.storage_uuid.clone()), None),
            MonKind::PrimaryStorage => (None, Some(mon.storage_uuid.clone())),
        };
        Self {
            mon_uuid: mon.uuid.clone(),
            backup_storage_uuid,
            primary_storage_uuid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingCmd {
    #[serde(flatten)]
    pub base: AgentCmd,
}

impl PingCmd {
    pub fn for_mon(mon: &MonRecord) -> Self {
        Self {
            base: AgentCmd::for_mon(mon),
        }
    }
}

/// Common shape of agent replies.
pub trait AgentResponse {
    fn success(&self) -> bool;

    fn error(&self) -> Option<&str>;

    fn operation_failure(&self) -> bool {
        false
    }

    /// A failure must explain itself, either with an error message or with
    /// the operation-failure flag.
    fn check(&self) -> Result<()> {
        let has_error = self.error().is_some_and(|e| !e.trim().is_empty());
        if !self.success() && !has_error && !self.operation_failure() {
            return Err(MonError::MalformedResponse {
                reason: "agent reported failure without an error message".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRsp {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl AgentResponse for AgentRsp {
    fn success(&self) -> bool {
        self.success
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingRsp {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub operation_failure: bool,
}

impl AgentResponse for PingRsp {
    fn success(&self) -> bool {
        self.success
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn operation_failure(&self) -> bool {
        self.operation_failure
    }
}

impl From<PingRsp> for PingResult {
    fn from(rsp: PingRsp) -> Self {
        if rsp.success {
            PingResult::healthy()
        } else {
            PingResult::unhealthy(rsp.error, rsp.operation_failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backup_storage_command_carries_backup_storage_uuid_only() {
        let mon = MonRecord::new(MonKind::BackupStorage, "bs-uuid", "host", 7761);
        let value = serde_json::to_value(PingCmd::for_mon(&mon)).unwrap();

        assert_eq!(value["monUuid"], json!(mon.uuid));
        assert_eq!(value["backupStorageUuid"], json!("bs-uuid"));
        assert!(value.get("primaryStorageUuid").is_none());
    }

    #[test]
    fn primary_storage_command_carries_primary_storage_uuid_only() {
        let mon = MonRecord::new(MonKind::PrimaryStorage, "ps-uuid", "host", 7762);
        let value = serde_json::to_value(AgentCmd::for_mon(&mon)).unwrap();

        assert_eq!(value["primaryStorageUuid"], json!("ps-uuid"));
        assert!(value.get("backupStorageUuid").is_none());
    }

    #[test]
    fn ping_response_failure_is_copied_through() {
        let rsp: PingRsp = serde_json::from_value(
            json!({"success": false, "error": "timeout", "operationFailure": true}),
        )
        .unwrap();

        assert_eq!(
            PingResult::from(rsp),
            PingResult {
                success: false,
                error: Some("timeout".to_string()),
                operation_failure: true,
            }
        );
    }

    #[test]
    fn successful_ping_drops_stray_error_text() {
        let rsp = PingRsp {
            success: true,
            error: Some("ignored".to_string()),
            operation_failure: false,
        };
        assert_eq!(PingResult::from(rsp), PingResult::healthy());
    }

    #[test]
    fn failure_without_explanation_is_malformed() {
        let bare = AgentRsp {
            success: false,
            error: Some("  ".to_string()),
        };
        assert!(matches!(bare.check(), Err(MonError::MalformedResponse { .. })));

        let flagged = PingRsp {
            success: false,
            error: None,
            operation_failure: true,
        };
        assert!(flagged.check().is_ok());
    }
}
