use thiserror::Error;

use crate::{
    db::traits::LedgerError,
    db_types::{Operation, OperationId},
    gateway::GatewayError,
    ledger::Rejection,
};

#[derive(Debug, Clone, Error)]
pub enum OperationFlowError {
    #[error("Invalid request. {0}")]
    Validation(String),
    #[error("{0}")]
    NotAdmissible(#[from] Rejection),
    #[error("{0}")]
    Gateway(#[from] GatewayError),
    #[error("The gateway declined the {} of {} in operation {}", .0.operation_type, .0.amount, .0.id)]
    Declined(Box<Operation>),
    #[error("Idempotency key {key} has already been used for a different operation. {reason}")]
    Conflict { key: OperationId, reason: String },
    #[error("Ledger error. {0}")]
    Database(#[from] LedgerError),
    #[error("The operation task did not run to completion. {0}")]
    TaskFailed(String),
}

impl OperationFlowError {
    /// Whether the caller may safely retry the same request with the same idempotency key.
    ///
    /// Transport failures and storage failures leave no record behind, or a record the retry will find, so a retry is
    /// always safe. Validation failures, rejections, declines and conflicts are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OperationFlowError::Gateway(_) | OperationFlowError::Database(_) | OperationFlowError::TaskFailed(_)
        )
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            OperationFlowError::NotAdmissible(r) => Some(*r),
            _ => None,
        }
    }

    /// The declined record, if the gateway declined the operation.
    pub fn declined_operation(&self) -> Option<&Operation> {
        match self {
            OperationFlowError::Declined(op) => Some(op.as_ref()),
            _ => None,
        }
    }
}
