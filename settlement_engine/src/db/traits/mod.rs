//! #  Ledger storage backends.
//!
//! This module defines the interface contract that storage *backends* of the settlement engine must fulfil.
//!
//! ## The operation ledger
//! Every monetary operation performed against the card gateway is recorded exactly once, as an immutable
//! [`crate::db_types::Operation`]. Records are grouped by their `group_id` (one group per payment intent) and are
//! returned in creation order. The state of a group is never stored; it is recomputed by folding the group's records.
//!
//! The operation id is the idempotency key. Backends must enforce its uniqueness at the storage layer, so that two
//! writers racing with the same key leave exactly one record behind.
//!
//! * [`LedgerStore`] defines the insert-only write path and the read queries the engine relies on.
mod data_objects;
mod ledger_store;

pub use data_objects::InsertOperationResult;
pub use ledger_store::{LedgerError, LedgerStore};
