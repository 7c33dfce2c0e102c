use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Cents, GroupId, Metadata, Operation, OperationId, OperationType, Outcome},
    gateway::MerchantCredentials,
    helpers::billing_cycle_key,
    ledger::GroupState,
    stl_api::errors::OperationFlowError,
};

pub const SUBSCRIPTION_ID: &str = "subscription_id";
pub const BILLING_DATE: &str = "billing_date";

/// What the caller is asking the gateway to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// Authorize `amount` against the given payment source (an already-tokenized card).
    Authorize { source_token: String },
    /// Authorize and capture `amount` in one step.
    Sale { source_token: String },
    Capture,
    /// Void the active authorization, or, when the parent is a Capture, that capture.
    Void,
    Refund,
}

impl RequestKind {
    pub fn operation_type(&self) -> OperationType {
        match self {
            RequestKind::Authorize { .. } => OperationType::Authorization,
            RequestKind::Sale { .. } => OperationType::Sale,
            RequestKind::Capture => OperationType::Capture,
            RequestKind::Void => OperationType::Void,
            RequestKind::Refund => OperationType::Refund,
        }
    }
}

/// A request to perform one operation on a group.
///
/// Follow-up operations (Capture, Void, Refund) identify their group directly with [`Self::with_group`], or through a
/// parent operation with [`Self::with_parent`]. Authorize and Sale without a group open a new one.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub kind: RequestKind,
    pub group_id: Option<GroupId>,
    pub parent_id: Option<OperationId>,
    /// Ignored for Void, whose amount is that of the reversed operation.
    pub amount: Cents,
    pub idempotency_key: Option<OperationId>,
    pub credentials: MerchantCredentials,
    pub customer_id: Option<String>,
    pub metadata: Metadata,
}

impl OperationRequest {
    fn new(kind: RequestKind, credentials: MerchantCredentials, amount: Cents) -> Self {
        Self {
            kind,
            group_id: None,
            parent_id: None,
            amount,
            idempotency_key: None,
            credentials,
            customer_id: None,
            metadata: Metadata::default(),
        }
    }

    pub fn authorize<S: Into<String>>(credentials: MerchantCredentials, source_token: S, amount: Cents) -> Self {
        Self::new(RequestKind::Authorize { source_token: source_token.into() }, credentials, amount)
    }

    pub fn sale<S: Into<String>>(credentials: MerchantCredentials, source_token: S, amount: Cents) -> Self {
        Self::new(RequestKind::Sale { source_token: source_token.into() }, credentials, amount)
    }

    pub fn capture(credentials: MerchantCredentials, group_id: GroupId, amount: Cents) -> Self {
        Self::new(RequestKind::Capture, credentials, amount).with_group(group_id)
    }

    pub fn void(credentials: MerchantCredentials, group_id: GroupId) -> Self {
        Self::new(RequestKind::Void, credentials, Cents::ZERO).with_group(group_id)
    }

    /// Voids the given operation: a Capture, or the active Authorization/Sale.
    pub fn void_operation(credentials: MerchantCredentials, parent_id: OperationId) -> Self {
        Self::new(RequestKind::Void, credentials, Cents::ZERO).with_parent(parent_id)
    }

    pub fn refund(credentials: MerchantCredentials, group_id: GroupId, amount: Cents) -> Self {
        Self::new(RequestKind::Refund, credentials, amount).with_group(group_id)
    }

    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_parent(mut self, parent_id: OperationId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_idempotency_key<K: Into<OperationId>>(mut self, key: K) -> Self {
        self.idempotency_key = Some(key.into());
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

    /// Keys the request to a subscription's billing cycle. Any number of identical requests for the same cycle charge
    /// at most once.
    pub fn for_billing_cycle(self, subscription_id: &str, billing_date: NaiveDate) -> Self {
        let key = billing_cycle_key(subscription_id, billing_date);
        self.with_idempotency_key(key)
            .with_metadata(SUBSCRIPTION_ID, subscription_id)
            .with_metadata(BILLING_DATE, billing_date.format("%Y-%m-%d").to_string())
    }

    pub fn operation_type(&self) -> OperationType {
        self.kind.operation_type()
    }

    pub fn merchant_id(&self) -> &str {
        self.credentials.merchant_id.as_str()
    }

    /// Rejects malformed requests before any storage or gateway work is done.
    pub fn validate(&self) -> Result<(), OperationFlowError> {
        let invalid = |msg: String| Err(OperationFlowError::Validation(msg));
        if self.merchant_id().is_empty() {
            return invalid("A merchant id is required".into());
        }
        if self.amount.is_negative() {
            return invalid(format!("Amount cannot be negative: {}", self.amount));
        }
        if matches!(self.idempotency_key.as_ref(), Some(k) if k.as_str().trim().is_empty()) {
            return invalid("The idempotency key cannot be blank".into());
        }
        match &self.kind {
            RequestKind::Authorize { source_token } | RequestKind::Sale { source_token } if source_token.is_empty() => {
                invalid(format!("A payment source token is required for a {}", self.operation_type()))
            },
            RequestKind::Capture | RequestKind::Refund if self.amount.is_zero() => {
                invalid(format!("A {} must be for a positive amount", self.operation_type()))
            },
            RequestKind::Capture | RequestKind::Void | RequestKind::Refund
                if self.group_id.is_none() && self.parent_id.is_none() =>
            {
                invalid(format!("A {} needs a group id or a parent operation id", self.operation_type()))
            },
            _ => Ok(()),
        }
    }

    /// True if `existing` is the record this request would have produced. Used to tell a genuine retry from an
    /// idempotency key that has been reused for a different operation.
    pub fn matches(&self, existing: &Operation) -> bool {
        let same_group = self.group_id.as_ref().map_or(true, |g| g == &existing.group_id);
        let same_parent = self.parent_id.as_ref().map_or(true, |p| existing.parent_id.as_ref() == Some(p));
        let same_amount = self.kind == RequestKind::Void || self.amount == existing.amount;
        existing.operation_type == self.operation_type() &&
            existing.merchant_id == self.merchant_id() &&
            same_group &&
            same_parent &&
            same_amount
    }
}

/// The record produced (or found) for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedOperation {
    pub operation: Operation,
    /// True when the record already existed and no gateway call was made.
    pub replayed: bool,
}

impl ExecutedOperation {
    pub fn id(&self) -> &OperationId {
        &self.operation.id
    }

    pub fn group_id(&self) -> &GroupId {
        &self.operation.group_id
    }

    pub fn is_approved(&self) -> bool {
        self.operation.outcome == Outcome::Approved
    }
}

/// A group's records, in creation order, and the state they fold into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHistory {
    pub group_id: GroupId,
    pub state: GroupState,
    pub operations: Vec<Operation>,
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use sqlx::types::Json;

    use super::*;

    fn merchant() -> MerchantCredentials {
        MerchantCredentials::new("m1", "key".into())
    }

    fn record(t: OperationType, amount: i64) -> Operation {
        Operation {
            seq: 1,
            id: "k1".into(),
            group_id: "g1".into(),
            parent_id: Some("a1".into()),
            operation_type: t,
            void_target: None,
            amount: Cents::from(amount),
            outcome: Outcome::Approved,
            gateway_token: "T".into(),
            gateway_reference: None,
            merchant_id: "m1".into(),
            customer_id: None,
            metadata: Json(Metadata::default()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn validation() {
        let ok = OperationRequest::capture(merchant(), "g1".into(), Cents::from(100));
        assert!(ok.validate().is_ok());
        let negative = OperationRequest::refund(merchant(), "g1".into(), Cents::from(-1));
        assert!(matches!(negative.validate(), Err(OperationFlowError::Validation(_))));
        let zero = OperationRequest::capture(merchant(), "g1".into(), Cents::ZERO);
        assert!(zero.validate().is_err());
        let no_source = OperationRequest::authorize(merchant(), "", Cents::from(100));
        assert!(no_source.validate().is_err());
        let mut orphan = OperationRequest::void(merchant(), "g1".into());
        orphan.group_id = None;
        assert!(orphan.validate().is_err());
        let no_merchant = OperationRequest::sale(MerchantCredentials::default(), "card", Cents::from(100));
        assert!(no_merchant.validate().is_err());
        let zero_auth = OperationRequest::authorize(merchant(), "card", Cents::ZERO);
        assert!(zero_auth.validate().is_ok());
    }

    #[test]
    fn retries_match_their_record() {
        let req = OperationRequest::refund(merchant(), "g1".into(), Cents::from(500)).with_idempotency_key("k1");
        assert!(req.matches(&record(OperationType::Refund, 500)));
        assert!(!req.matches(&record(OperationType::Refund, 501)));
        assert!(!req.matches(&record(OperationType::Capture, 500)));
        let other_group = OperationRequest::refund(merchant(), "g2".into(), Cents::from(500));
        assert!(!other_group.matches(&record(OperationType::Refund, 500)));
        let void = OperationRequest::void(merchant(), "g1".into());
        assert!(void.matches(&record(OperationType::Void, 10_000)));
    }

    #[test]
    fn billing_cycle_keys() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let a = OperationRequest::sale(merchant(), "card", Cents::from(999)).for_billing_cycle("sub_1", date);
        let b = OperationRequest::sale(merchant(), "card", Cents::from(999)).for_billing_cycle("sub_1", date);
        assert_eq!(a.idempotency_key, b.idempotency_key);
        assert_eq!(a.metadata.get(BILLING_DATE).map(String::as_str), Some("2024-05-01"));
    }
}
