//! # Mon Lifecycle
//!
//! Connect and ping for Ceph mon nodes.
//!
//! Every operation on a mon is submitted to a [`ChainTaskQueue`] under the
//! mon's sync signature, so two connects (or a connect and a ping) against
//! the same mon never overlap. Connecting runs a flow chain that checks
//! local tooling, deploys the agent and echoes it; the mon's status is only
//! ever changed through [`MonNode::change_status`].
//!
//! [`ChainTaskQueue`]: task_chain::ChainTaskQueue

pub use cephmon_core;

mod flows;
mod mon;
mod profile;

pub use flows::{missing_tools, CheckToolsFlow, DeployAgentFlow, EchoAgentFlow};
pub use mon::{BackupStorageMon, CephMon, MonBase, MonDeps, MonNode, PrimaryStorageMon};
pub use profile::{BackupStorage, MonProfile, PrimaryStorage};

// Re-export core types for convenience
pub use cephmon_core::{Completion, MonError, MonKind, MonRecord, MonStatus, PingResult, Result};
