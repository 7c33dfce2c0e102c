//! Pure predicates deciding whether an operation may be issued against a group's current state.
//!
//! Each check returns `Ok(())` when the operation is admissible, or the [`Rejection`] describing the first rule it
//! breaks. The rejection's `Display` is the reason string handed back to callers.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{Cents, OperationId},
    ledger::GroupState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Rejection {
    #[error("no active authorization found")]
    NoActiveAuthorization,
    #[error("authorization was voided")]
    AuthorizationVoided,
    #[error("exceeds remaining authorized amount")]
    ExceedsRemainingAuthorized,
    #[error("no active authorization to void")]
    NoActiveAuthorizationToVoid,
    #[error("authorization already voided")]
    AuthorizationAlreadyVoided,
    #[error("no captured amount to refund")]
    NoCapturedAmount,
    #[error("exceeds remaining refundable amount")]
    ExceedsRemainingRefundable,
    #[error("capture not found for active authorization")]
    CaptureNotFound,
    #[error("capture already voided")]
    CaptureAlreadyVoided,
}

impl Rejection {
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

pub fn can_capture(state: &GroupState, requested: Cents) -> Result<(), Rejection> {
    if !state.has_active_authorization() {
        return Err(Rejection::NoActiveAuthorization);
    }
    if state.is_authorization_voided {
        return Err(Rejection::AuthorizationVoided);
    }
    if requested > state.remaining_authorized() {
        return Err(Rejection::ExceedsRemainingAuthorized);
    }
    Ok(())
}

pub fn can_void(state: &GroupState) -> Result<(), Rejection> {
    if !state.has_active_authorization() {
        return Err(Rejection::NoActiveAuthorizationToVoid);
    }
    if state.is_authorization_voided {
        return Err(Rejection::AuthorizationAlreadyVoided);
    }
    Ok(())
}

/// A capture may be voided while its authorization is active, once.
pub fn can_void_capture(state: &GroupState, capture_id: &OperationId) -> Result<(), Rejection> {
    can_void(state)?;
    match state.capture(capture_id) {
        None => Err(Rejection::CaptureNotFound),
        Some(c) if c.voided => Err(Rejection::CaptureAlreadyVoided),
        Some(_) => Ok(()),
    }
}

/// A refund needs captured funds and a token to refund against. Voiding a Sale leaves its captured amount in place
/// but withdraws the only token the refund could travel on.
pub fn can_refund(state: &GroupState, requested: Cents) -> Result<(), Rejection> {
    if state.is_authorization_voided && state.capture_token.is_empty() {
        return Err(Rejection::AuthorizationVoided);
    }
    if state.captured_amount.is_zero() {
        return Err(Rejection::NoCapturedAmount);
    }
    if requested > state.remaining_refundable() {
        return Err(Rejection::ExceedsRemainingRefundable);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ledger::{compute_group_state, test_history::HistoryBuilder};

    fn state(auth: i64, captured: i64, refunded: i64) -> GroupState {
        GroupState {
            active_authorization_id: Some("a1".into()),
            active_authorization_amount: Cents::from(auth),
            active_authorization_token: "A1".into(),
            captured_amount: Cents::from(captured),
            refunded_amount: Cents::from(refunded),
            ..GroupState::default()
        }
    }

    #[test]
    fn capture_boundary() {
        let s = state(10_000, 6_000, 0);
        assert_eq!(can_capture(&s, Cents::from(4_000)), Ok(()));
        assert_eq!(can_capture(&s, Cents::from(4_001)), Err(Rejection::ExceedsRemainingAuthorized));
    }

    #[test]
    fn capture_without_authorization() {
        let err = can_capture(&GroupState::default(), Cents::from(1)).unwrap_err();
        assert_eq!(err.reason(), "no active authorization found");
    }

    #[test]
    fn capture_against_voided_authorization() {
        let s = GroupState { is_authorization_voided: true, ..state(10_000, 0, 0) };
        assert_eq!(can_capture(&s, Cents::from(1)).unwrap_err().reason(), "authorization was voided");
    }

    #[test]
    fn refund_boundary() {
        let s = state(10_000, 10_000, 7_500);
        assert_eq!(can_refund(&s, Cents::from(2_500)), Ok(()));
        let err = can_refund(&s, Cents::from(2_501)).unwrap_err();
        assert_eq!(err.reason(), "exceeds remaining refundable amount");
    }

    #[test]
    fn refund_with_nothing_captured() {
        let s = state(10_000, 0, 0);
        assert_eq!(can_refund(&s, Cents::from(1)).unwrap_err().reason(), "no captured amount to refund");
    }

    #[test]
    fn voided_sale_cannot_be_refunded() {
        let history = HistoryBuilder::new().sale("s1", 5_000, "S1").void_by_tag("v1", "auth", 5_000).build();
        let s = compute_group_state(&history);
        assert_eq!(s.captured_amount, Cents::from(5_000));
        assert_eq!(can_refund(&s, Cents::from(5_000)).unwrap_err().reason(), "authorization was voided");
    }

    #[test]
    fn captures_stay_refundable_after_the_authorization_is_voided() {
        let history = HistoryBuilder::new()
            .auth("a1", 10_000, "A1")
            .capture("c1", 4_000, "C1")
            .void_by_tag("v1", "auth", 10_000)
            .build();
        let s = compute_group_state(&history);
        assert_eq!(can_refund(&s, Cents::from(4_000)), Ok(()));
    }

    #[test]
    fn void_rules() {
        assert_eq!(can_void(&state(10_000, 0, 0)), Ok(()));
        assert_eq!(can_void(&GroupState::default()).unwrap_err().reason(), "no active authorization to void");
        let voided = GroupState { is_authorization_voided: true, ..state(10_000, 0, 0) };
        assert_eq!(can_void(&voided).unwrap_err().reason(), "authorization already voided");
    }

    #[test]
    fn a_voided_authorization_has_nothing_left_to_void() {
        let history = HistoryBuilder::new().auth("a1", 10_000, "A1").void_by_tag("v1", "auth", 10_000).build();
        let s = compute_group_state(&history);
        assert_eq!(can_void(&s), Err(Rejection::NoActiveAuthorizationToVoid));
        assert_eq!(can_capture(&s, Cents::from(1)), Err(Rejection::NoActiveAuthorization));
    }

    #[test]
    fn capture_voids() {
        let history = HistoryBuilder::new()
            .auth("a1", 10_000, "A1")
            .capture("c1", 3_000, "C1")
            .capture("c2", 2_000, "C2")
            .void_capture("v1", "c2", 2_000)
            .build();
        let s = compute_group_state(&history);
        assert_eq!(can_void_capture(&s, &"c1".into()), Ok(()));
        assert_eq!(can_void_capture(&s, &"c2".into()), Err(Rejection::CaptureAlreadyVoided));
        assert_eq!(can_void_capture(&s, &"c9".into()), Err(Rejection::CaptureNotFound));
        // The voided amount can be captured again
        assert_eq!(can_capture(&s, Cents::from(7_000)), Ok(()));
    }

    #[test]
    fn reauthorized_group_accepts_a_full_capture() {
        let history =
            HistoryBuilder::new().auth("a1", 10_000, "A1").capture("c1", 5_000, "C1").auth("a2", 15_000, "A2").build();
        let s = compute_group_state(&history);
        assert_eq!(s.captured_amount, Cents::ZERO);
        assert_eq!(s.refunded_amount, Cents::ZERO);
        assert_eq!(can_capture(&s, Cents::from(15_000)), Ok(()));
    }
}
