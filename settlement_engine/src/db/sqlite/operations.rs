use chrono::Utc;
use log::{debug, trace};
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db::traits::{InsertOperationResult, LedgerError},
    db_types::{GroupId, NewOperation, Operation, OperationId},
};

/// Inserts the operation, or returns the existing record if one with the same id is already in the ledger.
/// Run this inside a transaction and commit it, so that the new record is visible to other connections.
///
/// The `UNIQUE` constraint on `operations.id` decides the race between concurrent writers. The loser re-reads the
/// winning record.
pub async fn idempotent_insert(
    operation: NewOperation,
    conn: &mut SqliteConnection,
) -> Result<InsertOperationResult, LedgerError> {
    let id = operation.id.clone();
    match insert_operation(operation, conn).await {
        Ok(op) => {
            debug!("🗃️ Operation [{}] {} of {} recorded in group {}", op.id, op.operation_type, op.amount, op.group_id);
            Ok(InsertOperationResult::Inserted(op))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            trace!("🗃️ Operation [{id}] already exists. Returning the existing record");
            let existing = fetch_operation(&id, conn).await?.ok_or_else(|| LedgerError::OperationNotFound(id))?;
            Ok(InsertOperationResult::AlreadyExists(existing))
        },
        Err(e) => Err(LedgerError::from(e)),
    }
}

/// Inserts a new operation using the given connection. This is not atomic. You can embed this call inside a
/// transaction if you need to, and pass `&mut *tx` as the connection argument.
async fn insert_operation(operation: NewOperation, conn: &mut SqliteConnection) -> Result<Operation, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO operations (
                id,
                group_id,
                parent_id,
                operation_type,
                void_target,
                amount,
                outcome,
                gateway_token,
                gateway_reference,
                merchant_id,
                customer_id,
                metadata,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(operation.id)
    .bind(operation.group_id)
    .bind(operation.parent_id)
    .bind(operation.operation_type)
    .bind(operation.void_target)
    .bind(operation.amount)
    .bind(operation.outcome)
    .bind(operation.gateway_token)
    .bind(operation.gateway_reference)
    .bind(operation.merchant_id)
    .bind(operation.customer_id)
    .bind(Json(operation.metadata))
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

pub async fn fetch_operation(id: &OperationId, conn: &mut SqliteConnection) -> Result<Option<Operation>, LedgerError> {
    let op = sqlx::query_as("SELECT * FROM operations WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(op)
}

/// Returns every record in the group, in insertion order.
pub async fn fetch_group_history(
    group_id: &GroupId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Operation>, LedgerError> {
    let history = sqlx::query_as("SELECT * FROM operations WHERE group_id = $1 ORDER BY seq ASC")
        .bind(group_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(history)
}
