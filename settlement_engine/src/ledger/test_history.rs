use chrono::Utc;
use sqlx::types::Json;

use crate::db_types::{Cents, Metadata, Operation, OperationType, Outcome, VoidTarget, ORIGINAL_TRANSACTION_TYPE};

/// Builds group histories for the ledger tests. Records are numbered in the order they are added.
pub struct HistoryBuilder {
    ops: Vec<Operation>,
}

impl HistoryBuilder {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    fn push(mut self, id: &str, t: OperationType, amount: i64, token: &str, outcome: Outcome) -> Self {
        let seq = self.ops.len() as i64 + 1;
        self.ops.push(Operation {
            seq,
            id: id.into(),
            group_id: "g1".into(),
            parent_id: None,
            operation_type: t,
            void_target: None,
            amount: Cents::from(amount),
            outcome,
            gateway_token: token.to_string(),
            gateway_reference: None,
            merchant_id: "m1".into(),
            customer_id: None,
            metadata: Json(Metadata::default()),
            created_at: Utc::now(),
        });
        self
    }

    pub fn auth(self, id: &str, amount: i64, token: &str) -> Self {
        self.push(id, OperationType::Authorization, amount, token, Outcome::Approved)
    }

    pub fn sale(self, id: &str, amount: i64, token: &str) -> Self {
        self.push(id, OperationType::Sale, amount, token, Outcome::Approved)
    }

    pub fn capture(self, id: &str, amount: i64, token: &str) -> Self {
        self.push(id, OperationType::Capture, amount, token, Outcome::Approved)
    }

    pub fn refund(self, id: &str, amount: i64) -> Self {
        self.push(id, OperationType::Refund, amount, "", Outcome::Approved)
    }

    pub fn declined(self, id: &str, t: OperationType, amount: i64) -> Self {
        self.push(id, t, amount, "", Outcome::Declined)
    }

    /// A void recorded the legacy way, with the target only in the metadata.
    pub fn void_by_tag(mut self, id: &str, tag: &str, amount: i64) -> Self {
        self = self.push(id, OperationType::Void, amount, "", Outcome::Approved);
        if let Some(op) = self.ops.last_mut() {
            op.metadata.0.insert(ORIGINAL_TRANSACTION_TYPE.into(), tag.into());
        }
        self
    }

    pub fn void_capture(mut self, id: &str, capture_id: &str, amount: i64) -> Self {
        self = self.push(id, OperationType::Void, amount, "", Outcome::Approved);
        if let Some(op) = self.ops.last_mut() {
            op.void_target = Some(VoidTarget::Capture);
            op.parent_id = Some(capture_id.into());
        }
        self
    }

    pub fn build(self) -> Vec<Operation> {
        self.ops
    }
}
