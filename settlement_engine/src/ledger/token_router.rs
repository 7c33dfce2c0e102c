use crate::{db_types::OperationType, ledger::GroupState};

/// Selects the gateway token that must accompany the next operation of the given type.
///
/// * Capture and Void act on the active authorization, so they carry its token.
/// * Refund carries the most recent capture's token. In the Sale flow there is no separate capture, and the
///   authorization token is used instead.
/// * Authorization and Sale start a new chain from the card holder's payment source, so there is no chain token and an
///   empty string is returned.
pub fn token_for_operation(state: &GroupState, operation_type: OperationType) -> &str {
    match operation_type {
        OperationType::Capture | OperationType::Void => &state.active_authorization_token,
        OperationType::Refund if !state.capture_token.is_empty() => &state.capture_token,
        OperationType::Refund => &state.active_authorization_token,
        OperationType::Authorization | OperationType::Sale => "",
    }
}
