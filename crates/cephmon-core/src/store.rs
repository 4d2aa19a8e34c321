//! Persistence of mon records

use crate::error::{MonError, Result};
use crate::mon::MonRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Where mon records live. Registration and deletion happen elsewhere; the
/// lifecycle layer only loads records and writes status changes back.
#[async_trait]
pub trait MonStore: Send + Sync {
    async fn load(&self, uuid: &str) -> Result<MonRecord>;

    /// Persist `mon` and return the record as stored.
    async fn update_and_refresh(&self, mon: MonRecord) -> Result<MonRecord>;
}

/// Concurrent in-process store.
#[derive(Debug, Default)]
pub struct InMemoryMonStore {
    mons: DashMap<String, MonRecord>,
    updates: AtomicUsize,
}

impl InMemoryMonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record without counting it as an update.
    pub fn insert(&self, mon: MonRecord) {
        self.mons.insert(mon.uuid.clone(), mon);
    }

    pub fn get(&self, uuid: &str) -> Option<MonRecord> {
        self.mons.get(uuid).map(|entry| entry.value().clone())
    }

    /// Number of `update_and_refresh` calls served so far.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MonStore for InMemoryMonStore {
    async fn load(&self, uuid: &str) -> Result<MonRecord> {
        self.get(uuid).ok_or_else(|| MonError::MonNotFound {
            uuid: uuid.to_string(),
        })
    }

    async fn update_and_refresh(&self, mon: MonRecord) -> Result<MonRecord> {
        if !self.mons.contains_key(&mon.uuid) {
            return Err(MonError::MonNotFound { uuid: mon.uuid });
        }
        self.updates.fetch_add(1, Ordering::SeqCst);
        debug!(mon_uuid = %mon.uuid, status = %mon.status, "mon record updated");
        self.mons.insert(mon.uuid.clone(), mon.clone());
        Ok(mon)
    }
}
