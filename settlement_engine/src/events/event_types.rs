use serde::{Deserialize, Serialize};

use crate::db_types::{Operation, Outcome};

/// Emitted once for every record the engine writes to the ledger, whether the gateway approved or declined it.
///
/// Idempotent replays of an existing record do not emit an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecordedEvent {
    pub operation: Operation,
}

impl OperationRecordedEvent {
    pub fn new(operation: Operation) -> Self {
        Self { operation }
    }

    pub fn outcome(&self) -> Outcome {
        self.operation.outcome
    }
}
