use std::sync::Arc;

use dashmap::DashMap;
use log::*;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db_types::GroupId;

/// One async mutex per group. Operations on the same group are serialized; operations on different groups never
/// wait on each other.
#[derive(Debug, Default)]
pub struct GroupLocks {
    locks: DashMap<GroupId, Arc<Mutex<()>>>,
}

impl GroupLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the group. Access is released when the guard is dropped.
    pub async fn lock(&self, group_id: &GroupId) -> OwnedMutexGuard<()> {
        // The map entry is released before awaiting the mutex
        let mutex = Arc::clone(self.locks.entry(group_id.clone()).or_default().value());
        trace!("🔒️ Waiting for the lock on group {group_id}");
        let guard = mutex.lock_owned().await;
        trace!("🔒️ Acquired the lock on group {group_id}");
        guard
    }

    /// Drops the mutexes nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, m| Arc::strong_count(m) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
