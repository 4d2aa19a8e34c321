//! Per-kind constants

use cephmon_core::endpoints;
use cephmon_core::MonKind;

/// What differs between mons of different storage kinds.
pub trait MonProfile: Send + Sync + 'static {
    const KIND: MonKind;
    /// Prefix of the sync signature, completed with the mon UUID.
    const SYNC_PREFIX: &'static str;
    const ECHO_PATH: &'static str;
    const PING_PATH: &'static str;
    /// Playbook argument naming the agent package.
    const PACKAGE_ARGUMENT: &'static str;
}

#[derive(Debug, Clone, Copy)]
pub struct BackupStorage;

impl MonProfile for BackupStorage {
    const KIND: MonKind = MonKind::BackupStorage;
    const SYNC_PREFIX: &'static str = "ceph-backup-storage-mon";
    const ECHO_PATH: &'static str = endpoints::BACKUP_STORAGE_ECHO;
    const PING_PATH: &'static str = endpoints::BACKUP_STORAGE_PING;
    const PACKAGE_ARGUMENT: &'static str = "pkg_cephbagent";
}

#[derive(Debug, Clone, Copy)]
pub struct PrimaryStorage;

impl MonProfile for PrimaryStorage {
    const KIND: MonKind = MonKind::PrimaryStorage;
    const SYNC_PREFIX: &'static str = "ceph-primary-storage-mon";
    const ECHO_PATH: &'static str = endpoints::PRIMARY_STORAGE_ECHO;
    const PING_PATH: &'static str = endpoints::PRIMARY_STORAGE_PING;
    const PACKAGE_ARGUMENT: &'static str = "pkg_cephpagent";
}
