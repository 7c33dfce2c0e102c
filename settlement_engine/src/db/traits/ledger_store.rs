use async_trait::async_trait;
use thiserror::Error;

use crate::{
    db_types::{GroupId, NewOperation, Operation, OperationId},
    db::traits::InsertOperationResult,
};

/// The append-only ledger of operation records.
///
/// Implementations only ever insert. There is no update or delete path, and callers never hold a mutable aggregate:
/// the state of a group is always derived from [`LedgerStore::fetch_group_history`].
#[async_trait]
pub trait LedgerStore: Clone + Send + Sync + 'static {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Fetches the record with the given id (idempotency key), if it exists.
    async fn fetch_operation(&self, id: &OperationId) -> Result<Option<Operation>, LedgerError>;

    /// Fetches every record in the group, approved and declined, in ascending creation order.
    ///
    /// An unknown group yields an empty history.
    async fn fetch_group_history(&self, group_id: &GroupId) -> Result<Vec<Operation>, LedgerError>;

    /// Inserts the record unless a record with the same id already exists.
    ///
    /// The uniqueness check is enforced by the storage layer, so concurrent callers with the same id all succeed, but
    /// only one of them receives [`InsertOperationResult::Inserted`]. The others receive the winner's record in
    /// [`InsertOperationResult::AlreadyExists`].
    async fn insert_operation(&self, operation: NewOperation) -> Result<InsertOperationResult, LedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("The operation {0} vanished after a duplicate insert was detected")]
    OperationNotFound(OperationId),
    #[error("The stored record is invalid. {0}")]
    InvalidRecord(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for LedgerError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        LedgerError::DatabaseError(format!("Migration failed. {e}"))
    }
}
