//! Folds the history of a group into its current [`GroupState`].
//!
//! The state is never stored. It is recomputed from the immutable operation records every time it is needed, so two
//! readers of the same history always agree on it.
//!
//! Fold rules, applied in creation order. Declined records are skipped entirely.
//!
//! | Record        | Effect                                                                                     |
//! |---------------|--------------------------------------------------------------------------------------------|
//! | Authorization | Becomes the active authorization. Captured/refunded totals, void flag and capture token reset. |
//! | Sale          | As Authorization, then `captured_amount = amount`. The sale token doubles as capture token. |
//! | Capture       | `captured_amount += amount`, and its token becomes the capture token.                      |
//! | Void (auth)   | Clears the active authorization id and token, and flags the authorization as voided.        |
//! | Void (capture)| `captured_amount -= amount`. The authorization stays active.                               |
//! | Refund        | `refunded_amount += amount`.                                                               |
use serde::{Deserialize, Serialize};

use crate::db_types::{Cents, Operation, OperationId, OperationType, VoidTarget};

/// An approved capture against the active authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureEntry {
    pub id: OperationId,
    pub amount: Cents,
    pub token: String,
    pub voided: bool,
}

/// The derived state of a group. [`GroupState::default()`] is the state of an empty group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    pub active_authorization_id: Option<OperationId>,
    pub active_authorization_amount: Cents,
    pub active_authorization_token: String,
    pub captured_amount: Cents,
    pub refunded_amount: Cents,
    pub is_authorization_voided: bool,
    /// Token of the most recent approved, unvoided Capture. Empty if there is none.
    pub capture_token: String,
    /// Captures made against the active authorization, in creation order.
    pub captures: Vec<CaptureEntry>,
}

/// Folds an ordered operation history into a [`GroupState`].
///
/// `history` must be in ascending creation order, which is the order [`crate::LedgerStore::fetch_group_history`]
/// returns. The function is total: any history, including an empty one, produces a state.
pub fn compute_group_state(history: &[Operation]) -> GroupState {
    history.iter().fold(GroupState::default(), |mut state, op| {
        state.apply(op);
        state
    })
}

impl GroupState {
    /// Applies a single record to the state. Declined records are ignored.
    pub fn apply(&mut self, op: &Operation) {
        if !op.is_approved() {
            return;
        }
        match op.operation_type {
            OperationType::Authorization => self.reauthorize(op),
            OperationType::Sale => {
                self.reauthorize(op);
                self.captured_amount = op.amount;
            },
            OperationType::Capture => {
                self.captured_amount += op.amount;
                self.capture_token = op.gateway_token.clone();
                self.captures.push(CaptureEntry {
                    id: op.id.clone(),
                    amount: op.amount,
                    token: op.gateway_token.clone(),
                    voided: false,
                });
            },
            OperationType::Void => match op.void_target() {
                Some(VoidTarget::Capture) => self.void_capture(op),
                // A void with no target recorded reverses the authorization
                Some(VoidTarget::Authorization) | None => {
                    self.active_authorization_id = None;
                    self.active_authorization_token = String::default();
                    self.is_authorization_voided = true;
                },
            },
            OperationType::Refund => {
                self.refunded_amount += op.amount;
            },
        }
    }

    /// The amount that may still be captured against the active authorization.
    pub fn remaining_authorized(&self) -> Cents {
        self.active_authorization_amount - self.captured_amount
    }

    /// The amount that may still be refunded.
    pub fn remaining_refundable(&self) -> Cents {
        self.captured_amount - self.refunded_amount
    }

    pub fn has_active_authorization(&self) -> bool {
        self.active_authorization_id.is_some()
    }

    pub fn capture(&self, id: &OperationId) -> Option<&CaptureEntry> {
        self.captures.iter().find(|c| &c.id == id)
    }

    fn reauthorize(&mut self, op: &Operation) {
        *self = GroupState {
            active_authorization_id: Some(op.id.clone()),
            active_authorization_amount: op.amount,
            active_authorization_token: op.gateway_token.clone(),
            ..GroupState::default()
        };
    }

    fn void_capture(&mut self, op: &Operation) {
        self.captured_amount = self.captured_amount.saturating_sub(op.amount);
        let target = op.parent_id.as_ref().and_then(|id| self.captures.iter_mut().find(|c| &c.id == id));
        if let Some(capture) = target {
            capture.voided = true;
        }
        self.capture_token =
            self.captures.iter().rev().find(|c| !c.voided).map(|c| c.token.clone()).unwrap_or_default();
    }
}
