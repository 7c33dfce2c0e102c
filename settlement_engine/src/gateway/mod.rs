//! # Card gateway boundary
//!
//! The engine talks to the external card processor through [`GatewayClient`]. The client is a collaborator: it owns
//! the transport and the processor's wire format. All the engine needs is a definitive approve/decline outcome and
//! the token to use for the next operation in the chain.
//!
//! A client must only return `Ok` when the processor gave a definitive answer. Network failures, timeouts and
//! processor-side errors with no outcome are reported as [`GatewayError`], which the engine treats as retryable and
//! never records.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use settle_common::Secret;
use thiserror::Error;

use crate::db_types::{Cents, OperationType, Outcome};

/// The merchant's credentials with the processor, resolved by the caller.
#[derive(Debug, Clone, Default)]
pub struct MerchantCredentials {
    pub merchant_id: String,
    pub api_key: Secret<String>,
}

impl MerchantCredentials {
    pub fn new<S: Into<String>>(merchant_id: S, api_key: Secret<String>) -> Self {
        Self { merchant_id: merchant_id.into(), api_key }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// The chain token for follow-up operations, or the card holder's payment source for Authorization and Sale.
    pub token: String,
    pub operation_type: OperationType,
    pub amount: Cents,
    pub credentials: MerchantCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub outcome: Outcome,
    /// The token the processor issued for this operation.
    pub token: String,
    pub reference_code: String,
}

impl GatewayResponse {
    pub fn approved<S: Into<String>, R: Into<String>>(token: S, reference_code: R) -> Self {
        Self { outcome: Outcome::Approved, token: token.into(), reference_code: reference_code.into() }
    }

    pub fn declined<R: Into<String>>(reference_code: R) -> Self {
        Self { outcome: Outcome::Declined, token: String::default(), reference_code: reference_code.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("The card gateway could not be reached. {0}")]
    Unavailable(String),
    #[error("The card gateway did not respond in time")]
    Timeout,
    #[error("The card gateway failed without a definitive outcome. {0}")]
    ProcessorError(String),
}

/// Performs operations against the external card processor.
#[async_trait]
pub trait GatewayClient: Send + Sync + 'static {
    async fn execute(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError>;
}
