//! Settlement Engine
//!
//! The settlement engine sits between merchants and a card payment gateway. It executes Authorization, Sale, Capture,
//! Void and Refund operations, and keeps an append-only ledger of every definitive outcome the gateway returns.
//!
//! The library is divided into three main sections:
//! 1. The ledger itself ([`mod@ledger`]). Pure functions that fold a group's history into its [`ledger::GroupState`],
//!    decide whether the next operation is admissible, and pick the gateway token to use for it.
//! 2. Ledger storage ([`mod@db`]). Currently, SQLite is the supported backend. You should never need to access the
//!    database directly. The data types used in the database are defined in the `db_types` module and are public.
//! 3. The public API ([`mod@stl_api`]). [`OperationFlowApi`] runs requests idempotently and serializes the operations
//!    on each group, so concurrent requests can never overdraw an authorization or over-refund a capture.
//!
//! The engine emits an [`events::OperationRecordedEvent`] every time a new record is written. Subscribe to it through
//! [`events::EventHooks`].
mod db;

pub mod config;
pub mod db_types;
pub mod events;
pub mod gateway;
pub mod helpers;
pub mod ledger;
mod stl_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use config::EngineConfig;
#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::{InsertOperationResult, LedgerError, LedgerStore};
pub use events::{EventHandlers, EventHooks, EventProducers};
pub use gateway::{GatewayClient, GatewayError, GatewayRequest, GatewayResponse, MerchantCredentials};
pub use stl_api::{
    errors::OperationFlowError,
    group_locks::GroupLocks,
    ledger_api::LedgerApi,
    operation_flow_api::OperationFlowApi,
    operation_objects,
    operation_objects::{ExecutedOperation, GroupHistory, OperationRequest, RequestKind},
};
