//! # Settlement engine public API
//!
//! The `stl_api` module exposes the programmatic API for the settlement engine.
//!
//! * [`operation_flow_api`] executes Authorization, Sale, Capture, Void and Refund requests against the card gateway,
//!   idempotently, and records every definitive outcome in the ledger.
//! * [`ledger_api`] provides read access to recorded operations, group histories and group states.
//!
//! The other submodules in this module are support types.
//!
//! # API usage
//!
//! An API instance is created by supplying a ledger backend that implements [`crate::LedgerStore`], and for the flow
//! API, a [`crate::gateway::GatewayClient`]:
//!
//! ```rust,ignore
//! use settlement_engine::{EngineConfig, EventProducers, OperationFlowApi, OperationRequest, SqliteDatabase};
//! let db = SqliteDatabase::from_config(&EngineConfig::from_env_or_default()).await?;
//! let api = OperationFlowApi::new(db, my_gateway_client, EventProducers::default());
//! let auth = api.execute(OperationRequest::authorize(credentials, card_token, Cents::from(5000))).await?;
//! ```

pub mod errors;
pub mod group_locks;
pub mod ledger_api;
pub mod operation_flow_api;
pub mod operation_objects;
