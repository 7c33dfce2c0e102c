//! # The transaction group ledger
//!
//! Pure functions over the operation history of a group:
//! * [`compute_group_state`] folds the history into the authoritative [`GroupState`].
//! * [`can_capture`], [`can_void`], [`can_void_capture`] and [`can_refund`] decide admissibility.
//! * [`token_for_operation`] picks the gateway token for the next operation.
//!
//! Nothing in here touches storage or the gateway. The [`crate::OperationFlowApi`] strings them together.
mod admissibility;
mod group_state;
mod token_router;

#[cfg(test)]
pub(crate) mod test_history;

pub use admissibility::{can_capture, can_refund, can_void, can_void_capture, Rejection};
pub use group_state::{compute_group_state, CaptureEntry, GroupState};
pub use token_router::token_for_operation;
