//! # Cephmon Core
//!
//! Core types and traits for keeping Ceph mon nodes connected.
//!
//! A mon node hosts a storage agent reachable over HTTP. This crate holds
//! what every layer above needs to agree on:
//! - the mon record and its three-state connection status
//! - the error taxonomy shared by transport, provisioning and workflow code
//! - the one-shot [`Completion`] continuation every async operation reports through
//! - the persistence and provisioning collaborator traits

pub mod completion;
pub mod config;
pub mod error;
pub mod mon;
pub mod provision;
pub mod store;

pub use completion::{Completion, Promise};
pub use config::{AgentProfile, MonConfig};
pub use error::{MonError, Result};
pub use mon::{MonKind, MonRecord, MonStatus, PingResult};
pub use provision::{DeployRequest, FileSyncPair, Provisioner, SshTarget};
pub use store::{InMemoryMonStore, MonStore};

/// Current Cephmon version for compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cephmon build information for telemetry and debugging
pub const BUILD_INFO: &str = concat!(
    "Cephmon ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_NAME"),
    ")"
);

/// Fixed HTTP paths served by the storage agents
pub mod endpoints {
    pub const BACKUP_STORAGE_ECHO: &str = "/ceph/backupstorage/echo";
    pub const BACKUP_STORAGE_PING: &str = "/ceph/backupstorage/ping";
    pub const PRIMARY_STORAGE_ECHO: &str = "/ceph/primarystorage/echo";
    pub const PRIMARY_STORAGE_PING: &str = "/ceph/primarystorage/ping";
}
