use chrono::NaiveDate;
use cucumber::{then, when};
use settlement_engine::{
    db_types::{Cents, Outcome, VoidTarget},
    ledger::{compute_group_state, GroupState},
    GatewayError,
    LedgerStore,
    OperationFlowError,
    OperationRequest,
};

use crate::cucumber::SettlementWorld;

#[when(expr = "the merchant authorizes {int} cents on card '{word}' for group {word}")]
async fn authorize(world: &mut SettlementWorld, amount: i64, card: String, group: String) {
    let mut req = OperationRequest::authorize(world.merchant(), card, Cents::from(amount));
    if let Some(id) = world.groups.get(&group) {
        req = req.with_group(id.clone());
    }
    let result = world.api().execute(req).await;
    world.record_result(&group, result);
}

#[when(expr = "the merchant makes a sale of {int} cents on card '{word}' for group {word}")]
async fn sale(world: &mut SettlementWorld, amount: i64, card: String, group: String) {
    let mut req = OperationRequest::sale(world.merchant(), card, Cents::from(amount));
    if let Some(id) = world.groups.get(&group) {
        req = req.with_group(id.clone());
    }
    let result = world.api().execute(req).await;
    world.record_result(&group, result);
}

#[when(expr = "the merchant captures {int} cents on group {word}")]
async fn capture(world: &mut SettlementWorld, amount: i64, group: String) {
    let req = OperationRequest::capture(world.merchant(), world.group(&group), Cents::from(amount));
    let result = world.api().execute(req).await;
    if let Ok(op) = &result {
        world.last_capture.insert(group.clone(), op.id().clone());
    }
    world.record_result(&group, result);
}

#[when(expr = "the merchant refunds {int} cents on group {word}")]
async fn refund(world: &mut SettlementWorld, amount: i64, group: String) {
    let req = OperationRequest::refund(world.merchant(), world.group(&group), Cents::from(amount));
    let result = world.api().execute(req).await;
    world.record_result(&group, result);
}

#[when(expr = "the merchant refunds {int} cents on group {word} with key {word}")]
async fn refund_with_key(world: &mut SettlementWorld, amount: i64, group: String, key: String) {
    let req =
        OperationRequest::refund(world.merchant(), world.group(&group), Cents::from(amount)).with_idempotency_key(key);
    let result = world.api().execute(req).await;
    world.record_result(&group, result);
}

#[when(expr = "the merchant voids group {word}")]
async fn void_group(world: &mut SettlementWorld, group: String) {
    let req = OperationRequest::void(world.merchant(), world.group(&group));
    let result = world.api().execute(req).await;
    world.record_result(&group, result);
}

#[when(expr = "the merchant voids the last capture on group {word}")]
async fn void_last_capture(world: &mut SettlementWorld, group: String) {
    let capture_id = world.last_capture.get(&group).cloned().expect("No capture has been made on this group");
    let req = OperationRequest::void_operation(world.merchant(), capture_id);
    let result = world.api().execute(req).await;
    world.record_result(&group, result);
}

#[when(expr = "subscription {word} is billed {int} cents on card '{word}' for the cycle of {word}")]
async fn bill_subscription(world: &mut SettlementWorld, subscription: String, amount: i64, card: String, date: String) {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").expect("Dates are formatted as YYYY-MM-DD");
    let req = OperationRequest::sale(world.merchant(), card, Cents::from(amount)).for_billing_cycle(&subscription, date);
    let result = world.api().execute(req).await;
    world.record_result(&subscription, result);
}

#[when("the gateway declines the next operation")]
async fn gateway_declines(world: &mut SettlementWorld) {
    world.gateway().decline_next("do not honor");
}

#[when("the gateway is unreachable for the next operation")]
async fn gateway_unreachable(world: &mut SettlementWorld) {
    world.gateway().fail_next(GatewayError::Unavailable("connection refused".into()));
}

#[then("the operation is approved")]
async fn operation_approved(world: &mut SettlementWorld) {
    match world.last_result() {
        Ok(op) => assert_eq!(op.operation.outcome, Outcome::Approved),
        Err(e) => panic!("Expected the operation to be approved, but it failed: {e}"),
    }
}

#[then("the operation is replayed")]
async fn operation_replayed(world: &mut SettlementWorld) {
    let op = world.last_result().as_ref().expect("Expected the operation to succeed");
    assert!(op.replayed, "Expected a replay of an existing record");
}

#[then("the operation is declined")]
async fn operation_declined(world: &mut SettlementWorld) {
    let op = world.last_result().as_ref().err().and_then(|e| e.declined_operation()).expect("Expected a decline");
    assert_eq!(op.outcome, Outcome::Declined);
}

#[then(expr = "the operation is rejected with {string}")]
async fn operation_rejected(world: &mut SettlementWorld, reason: String) {
    match world.last_result() {
        Err(OperationFlowError::NotAdmissible(r)) => assert_eq!(r.reason(), reason),
        other => panic!("Expected a rejection with '{reason}', got {other:?}"),
    }
}

#[then("the operation fails with a retryable error")]
async fn operation_retryable(world: &mut SettlementWorld) {
    let err = world.last_result().as_ref().expect_err("Expected the operation to fail");
    assert!(err.is_retryable(), "{err} should be retryable");
}

#[then("the void reversed a capture")]
async fn void_reversed_capture(world: &mut SettlementWorld) {
    let op = world.last_result().as_ref().expect("Expected the void to succeed");
    assert_eq!(op.operation.void_target(), Some(VoidTarget::Capture));
    assert_eq!(op.operation.metadata_value("original_transaction_type"), Some("capture"));
}

async fn group_state(world: &SettlementWorld, group: &str) -> GroupState {
    let history = world.api().db().fetch_group_history(&world.group(group)).await.expect("Error fetching history");
    compute_group_state(&history)
}

#[then(expr = "group {word} has captured {int} cents and refunded {int} cents")]
async fn group_totals(world: &mut SettlementWorld, group: String, captured: i64, refunded: i64) {
    let state = group_state(world, &group).await;
    assert_eq!(state.captured_amount, Cents::from(captured));
    assert_eq!(state.refunded_amount, Cents::from(refunded));
}

#[then(expr = "group {word} has {int} cents left to capture")]
async fn remaining_to_capture(world: &mut SettlementWorld, group: String, remaining: i64) {
    let state = group_state(world, &group).await;
    assert_eq!(state.remaining_authorized(), Cents::from(remaining));
}

#[then(expr = "group {word} has no active authorization")]
async fn no_active_authorization(world: &mut SettlementWorld, group: String) {
    let state = group_state(world, &group).await;
    assert!(!state.has_active_authorization());
}

#[then(expr = "group {word} has {int} records")]
async fn record_count(world: &mut SettlementWorld, group: String, count: usize) {
    let history = world.api().db().fetch_group_history(&world.group(&group)).await.expect("Error fetching history");
    assert_eq!(history.len(), count);
}

#[then(expr = "the gateway was called {int} times")]
async fn gateway_calls(world: &mut SettlementWorld, count: usize) {
    assert_eq!(world.gateway().call_count(), count);
}

#[then(expr = "the gateway received the tokens {string}")]
async fn tokens_sent(world: &mut SettlementWorld, tokens: String) {
    let expected = tokens.split(',').map(|t| t.trim().to_string()).collect::<Vec<_>>();
    assert_eq!(world.gateway().tokens_sent(), expected);
}
