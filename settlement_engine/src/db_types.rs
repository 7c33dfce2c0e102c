use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

pub use settle_common::Cents;

/// Metadata key recording which kind of operation a Void reverses.
pub const ORIGINAL_TRANSACTION_TYPE: &str = "original_transaction_type";
/// Metadata key holding the gateway's reference code for the operation.
pub const GATEWAY_REFERENCE: &str = "gateway_reference";

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------        GroupId        ---------------------------------------------------------
/// Identifies the lifecycle chain (one checkout or payment intent) an operation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------      OperationId      ---------------------------------------------------------
/// The unique id of an operation record. Doubles as the idempotency key when one is supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OperationId(pub String);

impl OperationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OperationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OperationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------     OperationType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OperationType {
    /// Reserves funds on the card. Starts (or restarts) an authorization chain.
    Authorization,
    /// Atomic authorize + capture at the gateway.
    Sale,
    /// Settles some or all of the active authorization.
    Capture,
    /// Cancels the active authorization, or reverses a single capture on the same day.
    Void,
    /// Returns captured funds to the card holder.
    Refund,
}

impl OperationType {
    /// Authorizations and Sales start a new authorization chain within the group.
    pub fn is_authorizing(&self) -> bool {
        matches!(self, Self::Authorization | Self::Sale)
    }
}

impl Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Authorization => write!(f, "Authorization"),
            OperationType::Sale => write!(f, "Sale"),
            OperationType::Capture => write!(f, "Capture"),
            OperationType::Void => write!(f, "Void"),
            OperationType::Refund => write!(f, "Refund"),
        }
    }
}

impl FromStr for OperationType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Authorization" => Ok(Self::Authorization),
            "Sale" => Ok(Self::Sale),
            "Capture" => Ok(Self::Capture),
            "Void" => Ok(Self::Void),
            "Refund" => Ok(Self::Refund),
            s => Err(ConversionError(format!("Invalid operation type: {s}"))),
        }
    }
}

//--------------------------------------        Outcome        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum Outcome {
    Approved,
    Declined,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Approved => write!(f, "Approved"),
            Outcome::Declined => write!(f, "Declined"),
        }
    }
}

impl From<String> for Outcome {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Approved" => Self::Approved,
            "Declined" => Self::Declined,
            other => {
                error!("Invalid outcome: {other}. This conversion cannot fail, so treating it as Declined");
                Self::Declined
            },
        }
    }
}

//--------------------------------------      VoidTarget       ---------------------------------------------------------
/// What a Void reverses. Stored alongside the record, and mirrored in its metadata under
/// [`ORIGINAL_TRANSACTION_TYPE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum VoidTarget {
    /// The active authorization is cancelled.
    #[sqlx(rename = "auth")]
    #[serde(rename = "auth")]
    Authorization,
    /// A single capture is reversed. The authorization stays active.
    #[sqlx(rename = "capture")]
    #[serde(rename = "capture")]
    Capture,
}

impl VoidTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoidTarget::Authorization => "auth",
            VoidTarget::Capture => "capture",
        }
    }
}

impl Display for VoidTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoidTarget {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auth" => Ok(Self::Authorization),
            "capture" => Ok(Self::Capture),
            s => Err(ConversionError(format!("Invalid void target: {s}"))),
        }
    }
}

pub type Metadata = BTreeMap<String, String>;

//--------------------------------------       Operation       ---------------------------------------------------------
/// An immutable, persisted ledger record. Records are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Operation {
    /// Monotonic insertion sequence. Defines fold order within a group.
    pub seq: i64,
    pub id: OperationId,
    pub group_id: GroupId,
    pub parent_id: Option<OperationId>,
    pub operation_type: OperationType,
    /// Only set for `Void` records.
    pub void_target: Option<VoidTarget>,
    pub amount: Cents,
    pub outcome: Outcome,
    /// The token the processor returned for this operation. Empty for most declines.
    pub gateway_token: String,
    pub gateway_reference: Option<String>,
    pub merchant_id: String,
    pub customer_id: Option<String>,
    pub metadata: Json<Metadata>,
    pub created_at: DateTime<Utc>,
}

impl Operation {
    pub fn is_approved(&self) -> bool {
        self.outcome == Outcome::Approved
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.0.get(key).map(String::as_str)
    }

    /// The void target, falling back to the metadata tag for records that only carry the latter.
    pub fn void_target(&self) -> Option<VoidTarget> {
        self.void_target.or_else(|| self.metadata_value(ORIGINAL_TRANSACTION_TYPE).and_then(|s| s.parse().ok()))
    }
}

//--------------------------------------     NewOperation      ---------------------------------------------------------
/// An operation record that is about to be inserted into the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOperation {
    pub id: OperationId,
    pub group_id: GroupId,
    pub parent_id: Option<OperationId>,
    pub operation_type: OperationType,
    pub void_target: Option<VoidTarget>,
    pub amount: Cents,
    pub outcome: Outcome,
    pub gateway_token: String,
    pub gateway_reference: Option<String>,
    pub merchant_id: String,
    pub customer_id: Option<String>,
    pub metadata: Metadata,
}

impl NewOperation {
    pub fn new<S: Into<String>>(
        id: OperationId,
        group_id: GroupId,
        operation_type: OperationType,
        amount: Cents,
        merchant_id: S,
    ) -> Self {
        Self {
            id,
            group_id,
            parent_id: None,
            operation_type,
            void_target: None,
            amount,
            outcome: Outcome::Approved,
            gateway_token: String::default(),
            gateway_reference: None,
            merchant_id: merchant_id.into(),
            customer_id: None,
            metadata: Metadata::default(),
        }
    }

    pub fn with_parent(mut self, parent_id: OperationId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Marks this record as a Void of the given target, tagging the metadata to match.
    pub fn with_void_target(mut self, target: VoidTarget) -> Self {
        self.void_target = Some(target);
        self.metadata.insert(ORIGINAL_TRANSACTION_TYPE.to_string(), target.as_str().to_string());
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.gateway_token = token.into();
        self
    }

    pub fn with_gateway_reference<S: Into<String>>(mut self, reference: S) -> Self {
        let reference = reference.into();
        self.metadata.insert(GATEWAY_REFERENCE.to_string(), reference.clone());
        self.gateway_reference = Some(reference);
        self
    }

    pub fn with_customer_id<S: Into<String>>(mut self, customer_id: S) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn operation_type_round_trips_through_strings() {
        for t in [
            OperationType::Authorization,
            OperationType::Sale,
            OperationType::Capture,
            OperationType::Void,
            OperationType::Refund,
        ] {
            assert_eq!(t.to_string().parse::<OperationType>().unwrap(), t);
        }
        assert!("Chargeback".parse::<OperationType>().is_err());
    }

    #[test]
    fn void_target_tags_metadata() {
        let op = NewOperation::new("v1".into(), "g1".into(), OperationType::Void, Cents::from(500), "m1")
            .with_void_target(VoidTarget::Capture);
        assert_eq!(op.metadata.get(ORIGINAL_TRANSACTION_TYPE).map(String::as_str), Some("capture"));
        assert_eq!(op.void_target, Some(VoidTarget::Capture));
    }

    #[test]
    fn unknown_outcome_is_treated_as_declined() {
        assert_eq!(Outcome::from("Approved".to_string()), Outcome::Approved);
        assert_eq!(Outcome::from("Pending".to_string()), Outcome::Declined);
    }
}
