//! Read-only access to the operation ledger.

use std::fmt::Debug;

use log::trace;

use crate::{
    db::traits::{LedgerError, LedgerStore},
    db_types::{GroupId, Operation, OperationId},
    ledger::{compute_group_state, GroupState},
    stl_api::operation_objects::GroupHistory,
};

/// The `LedgerApi` answers questions about recorded operations and the groups they belong to.
pub struct LedgerApi<B> {
    db: B,
}

impl<B: Debug> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi ({:?})", self.db)
    }
}

impl<B> LedgerApi<B>
where B: LedgerStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Fetches the operation with the given id (which is also its idempotency key).
    pub async fn operation(&self, id: &OperationId) -> Result<Option<Operation>, LedgerError> {
        self.db.fetch_operation(id).await
    }

    /// All the records of the group in creation order, with the state they fold into. `None` if the group has no
    /// records.
    pub async fn group_history(&self, group_id: &GroupId) -> Result<Option<GroupHistory>, LedgerError> {
        let operations = self.db.fetch_group_history(group_id).await?;
        if operations.is_empty() {
            return Ok(None);
        }
        trace!("🗃️ Folding {} records for group {group_id}", operations.len());
        let state = compute_group_state(&operations);
        Ok(Some(GroupHistory { group_id: group_id.clone(), state, operations }))
    }

    /// The current state of the group. An unknown group has the empty state.
    pub async fn group_state(&self, group_id: &GroupId) -> Result<GroupState, LedgerError> {
        let operations = self.db.fetch_group_history(group_id).await?;
        Ok(compute_group_state(&operations))
    }
}
