use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    db::traits::{InsertOperationResult, LedgerStore},
    db_types::{Cents, GroupId, NewOperation, Operation, OperationId, OperationType, Outcome, VoidTarget},
    events::{EventProducers, OperationRecordedEvent},
    gateway::{GatewayClient, GatewayRequest},
    helpers::{group_id_for_key, new_group_id, new_operation_id},
    ledger::{can_capture, can_refund, can_void, can_void_capture, compute_group_state, token_for_operation, GroupState},
    stl_api::{
        errors::OperationFlowError,
        group_locks::GroupLocks,
        operation_objects::{ExecutedOperation, OperationRequest, RequestKind},
    },
};

/// `OperationFlowApi` executes payment operations against the card gateway and records their outcomes in the ledger.
///
/// For every request it
/// 1. returns the existing record if the idempotency key has been seen before, without calling the gateway;
/// 2. takes the group's lock, folds the group history into its current state and checks admissibility;
/// 3. routes the right token to the gateway and records the outcome, approved or declined, exactly once.
///
/// Gateway failures with no definitive outcome leave no record, so the request can be retried with the same key.
///
/// Each request runs on its own task. If the caller stops waiting, the gateway call and the ledger write still complete,
/// and a retry with the same key picks up the recorded outcome.
pub struct OperationFlowApi<B, G> {
    inner: Arc<FlowInner<B, G>>,
}

struct FlowInner<B, G> {
    db: B,
    gateway: G,
    locks: GroupLocks,
    producers: EventProducers,
}

/// What will be sent to the gateway and written to the ledger for an admissible request.
struct Plan {
    group_id: GroupId,
    parent_id: Option<OperationId>,
    void_target: Option<VoidTarget>,
    amount: Cents,
    token: String,
}

impl<B, G> Clone for OperationFlowApi<B, G> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<B, G> Debug for OperationFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OperationFlowApi")
    }
}

impl<B, G> OperationFlowApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        let inner = FlowInner { db, gateway, locks: GroupLocks::new(), producers };
        Self { inner: Arc::new(inner) }
    }

    pub fn db(&self) -> &B {
        &self.inner.db
    }

    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    /// The number of groups with a lock currently held or awaited.
    pub fn active_groups(&self) -> usize {
        self.inner.locks.len()
    }
}

impl<B, G> OperationFlowApi<B, G>
where
    B: LedgerStore,
    G: GatewayClient,
{
    /// Execute the request and return its ledger record.
    ///
    /// A request whose idempotency key already has a record returns that record with `replayed` set, provided the
    /// request matches it. A declined outcome is returned as [`OperationFlowError::Declined`], for the first call and
    /// every replay alike.
    pub async fn execute(&self, request: OperationRequest) -> Result<ExecutedOperation, OperationFlowError> {
        request.validate()?;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.process(request).await }).await.map_err(|e| {
            error!("🔄️ The operation task failed: {e}");
            OperationFlowError::TaskFailed(e.to_string())
        })?
    }

    pub async fn authorize(&self, request: OperationRequest) -> Result<ExecutedOperation, OperationFlowError> {
        self.expect_kind(&request, OperationType::Authorization)?;
        self.execute(request).await
    }

    pub async fn sale(&self, request: OperationRequest) -> Result<ExecutedOperation, OperationFlowError> {
        self.expect_kind(&request, OperationType::Sale)?;
        self.execute(request).await
    }

    pub async fn capture(&self, request: OperationRequest) -> Result<ExecutedOperation, OperationFlowError> {
        self.expect_kind(&request, OperationType::Capture)?;
        self.execute(request).await
    }

    pub async fn void(&self, request: OperationRequest) -> Result<ExecutedOperation, OperationFlowError> {
        self.expect_kind(&request, OperationType::Void)?;
        self.execute(request).await
    }

    pub async fn refund(&self, request: OperationRequest) -> Result<ExecutedOperation, OperationFlowError> {
        self.expect_kind(&request, OperationType::Refund)?;
        self.execute(request).await
    }

    fn expect_kind(&self, request: &OperationRequest, expected: OperationType) -> Result<(), OperationFlowError> {
        if request.operation_type() == expected {
            Ok(())
        } else {
            let actual = request.operation_type();
            Err(OperationFlowError::Validation(format!("Expected a {expected} request, got a {actual}")))
        }
    }
}

impl<B, G> FlowInner<B, G>
where
    B: LedgerStore,
    G: GatewayClient,
{
    async fn process(&self, request: OperationRequest) -> Result<ExecutedOperation, OperationFlowError> {
        if let Some(existing) = self.fetch_by_key(&request).await? {
            return replay(&request, existing);
        }
        let parent = self.fetch_parent(&request).await?;
        let group_id = resolve_group_id(&request, parent.as_ref())?;
        let guard = self.locks.lock(&group_id).await;
        let result = self.process_locked(&request, group_id, parent).await;
        drop(guard);
        self.locks.prune();
        result
    }

    async fn process_locked(
        &self,
        request: &OperationRequest,
        group_id: GroupId,
        parent: Option<Operation>,
    ) -> Result<ExecutedOperation, OperationFlowError> {
        // A request with the same key may have finished while this one waited for the lock
        if let Some(existing) = self.fetch_by_key(request).await? {
            return replay(request, existing);
        }
        let history = self.db.fetch_group_history(&group_id).await?;
        check_group(request, &group_id, &history)?;
        let state = compute_group_state(&history);
        let plan = plan_operation(request, group_id.clone(), &state, parent.as_ref()).map_err(|e| {
            debug!("🔄️ {} on group {group_id} refused. {e} {}", request.operation_type(), state_summary(&state));
            e
        })?;
        let gateway_request = GatewayRequest {
            token: plan.token.clone(),
            operation_type: request.operation_type(),
            amount: plan.amount,
            credentials: request.credentials.clone(),
        };
        trace!("🔄️💳️ Sending {} of {} for group {} to the gateway", request.operation_type(), plan.amount, plan.group_id);
        let response = self.gateway.execute(gateway_request).await.map_err(|e| {
            warn!(
                "🔄️💳️ {} for group {} failed at the gateway. Nothing was recorded. {e}",
                request.operation_type(),
                plan.group_id
            );
            OperationFlowError::from(e)
        })?;
        let new_op = build_operation(request, plan, response.outcome, response.token, response.reference_code);
        match self.db.insert_operation(new_op).await? {
            InsertOperationResult::Inserted(op) => {
                info!(
                    "🔄️ {} [{}] of {} on group {} recorded as {}",
                    op.operation_type, op.id, op.amount, op.group_id, op.outcome
                );
                self.producers.publish_operation_recorded(OperationRecordedEvent::new(op.clone())).await;
                finish(op, false)
            },
            InsertOperationResult::AlreadyExists(op) => {
                warn!(
                    "🔄️ Operation [{}] was recorded by another writer while this one was at the gateway. Returning the \
                     recorded outcome.",
                    op.id
                );
                replay(request, op)
            },
        }
    }

    async fn fetch_by_key(&self, request: &OperationRequest) -> Result<Option<Operation>, OperationFlowError> {
        match &request.idempotency_key {
            Some(key) => Ok(self.db.fetch_operation(key).await?),
            None => Ok(None),
        }
    }

    async fn fetch_parent(&self, request: &OperationRequest) -> Result<Option<Operation>, OperationFlowError> {
        let Some(parent_id) = &request.parent_id else {
            return Ok(None);
        };
        self.db
            .fetch_operation(parent_id)
            .await?
            .map(Some)
            .ok_or_else(|| OperationFlowError::Validation(format!("Parent operation {parent_id} does not exist")))
    }
}

/// The group is taken from the parent operation, then the request. Authorize and Sale without either open a new group.
fn resolve_group_id(request: &OperationRequest, parent: Option<&Operation>) -> Result<GroupId, OperationFlowError> {
    match (parent, &request.group_id) {
        (Some(p), Some(g)) if &p.group_id != g => Err(OperationFlowError::Validation(format!(
            "Parent operation {} belongs to group {}, not {g}",
            p.id, p.group_id
        ))),
        (Some(p), _) => Ok(p.group_id.clone()),
        (None, Some(g)) => Ok(g.clone()),
        (None, None) if request.operation_type().is_authorizing() => {
            Ok(request.idempotency_key.as_ref().map(group_id_for_key).unwrap_or_else(new_group_id))
        },
        (None, None) => Err(OperationFlowError::Validation(format!(
            "A {} needs a group id or a parent operation id",
            request.operation_type()
        ))),
    }
}

fn check_group(request: &OperationRequest, group_id: &GroupId, history: &[Operation]) -> Result<(), OperationFlowError> {
    match history.first() {
        None if !request.operation_type().is_authorizing() => {
            Err(OperationFlowError::Validation(format!("Group {group_id} does not exist")))
        },
        Some(first) if first.merchant_id != request.merchant_id() => {
            warn!("🔄️ Merchant {} tried to operate on group {group_id}, which it does not own", request.merchant_id());
            Err(OperationFlowError::Validation(format!("Group {group_id} does not belong to this merchant")))
        },
        _ => Ok(()),
    }
}

fn plan_operation(
    request: &OperationRequest,
    group_id: GroupId,
    state: &GroupState,
    parent: Option<&Operation>,
) -> Result<Plan, OperationFlowError> {
    let op_type = request.operation_type();
    let default_parent = || request.parent_id.clone().or_else(|| state.active_authorization_id.clone());
    let plan = match &request.kind {
        RequestKind::Authorize { source_token } | RequestKind::Sale { source_token } => Plan {
            group_id,
            parent_id: request.parent_id.clone(),
            void_target: None,
            amount: request.amount,
            token: source_token.clone(),
        },
        RequestKind::Capture => {
            can_capture(state, request.amount)?;
            let token = token_for_operation(state, op_type).to_string();
            Plan { group_id, parent_id: default_parent(), void_target: None, amount: request.amount, token }
        },
        RequestKind::Refund => {
            can_refund(state, request.amount)?;
            let token = token_for_operation(state, op_type).to_string();
            Plan { group_id, parent_id: default_parent(), void_target: None, amount: request.amount, token }
        },
        RequestKind::Void => {
            let token = token_for_operation(state, op_type).to_string();
            match parent {
                Some(p) if p.operation_type == OperationType::Capture => {
                    can_void_capture(state, &p.id)?;
                    Plan {
                        group_id,
                        parent_id: Some(p.id.clone()),
                        void_target: Some(VoidTarget::Capture),
                        amount: p.amount,
                        token,
                    }
                },
                Some(p) if !p.operation_type.is_authorizing() => {
                    return Err(OperationFlowError::Validation(format!("A {} cannot be voided", p.operation_type)));
                },
                _ => {
                    can_void(state)?;
                    if let Some(p) = parent {
                        if state.active_authorization_id.as_ref() != Some(&p.id) {
                            return Err(OperationFlowError::Validation(format!(
                                "Operation {} is not the active authorization of group {group_id}",
                                p.id
                            )));
                        }
                    }
                    Plan {
                        group_id,
                        parent_id: state.active_authorization_id.clone(),
                        void_target: Some(VoidTarget::Authorization),
                        amount: state.active_authorization_amount,
                        token,
                    }
                },
            }
        },
    };
    Ok(plan)
}

fn build_operation(
    request: &OperationRequest,
    plan: Plan,
    outcome: Outcome,
    gateway_token: String,
    reference_code: String,
) -> NewOperation {
    let id = request.idempotency_key.clone().unwrap_or_else(new_operation_id);
    let mut op = NewOperation::new(id, plan.group_id, request.operation_type(), plan.amount, request.merchant_id())
        .with_outcome(outcome)
        .with_gateway_reference(reference_code);
    // Declined records never carry a usable token
    if outcome == Outcome::Approved {
        op = op.with_token(gateway_token);
    }
    if let Some(parent_id) = plan.parent_id {
        op = op.with_parent(parent_id);
    }
    if let Some(customer_id) = &request.customer_id {
        op = op.with_customer_id(customer_id.as_str());
    }
    for (k, v) in &request.metadata {
        op = op.with_metadata(k.as_str(), v.as_str());
    }
    // Applied last so that the recorded target cannot be overwritten by caller metadata
    if let Some(target) = plan.void_target {
        op = op.with_void_target(target);
    }
    op
}

fn replay(request: &OperationRequest, existing: Operation) -> Result<ExecutedOperation, OperationFlowError> {
    if !request.matches(&existing) {
        warn!("🔄️ Idempotency key {} was reused for a different operation", existing.id);
        return Err(OperationFlowError::Conflict {
            key: existing.id.clone(),
            reason: format!(
                "It is recorded as a {} of {} on group {} for merchant {}",
                existing.operation_type, existing.amount, existing.group_id, existing.merchant_id
            ),
        });
    }
    debug!("🔄️ Operation [{}] has already been recorded. Returning the recorded outcome.", existing.id);
    finish(existing, true)
}

fn finish(operation: Operation, replayed: bool) -> Result<ExecutedOperation, OperationFlowError> {
    match operation.outcome {
        Outcome::Approved => Ok(ExecutedOperation { operation, replayed }),
        Outcome::Declined => Err(OperationFlowError::Declined(Box::new(operation))),
    }
}

fn state_summary(state: &GroupState) -> String {
    format!(
        "[auth: {}, captured: {}, refunded: {}, voided: {}]",
        state.active_authorization_amount, state.captured_amount, state.refunded_amount, state.is_authorization_voided
    )
}
