use blake2::{Blake2b512, Digest};
use chrono::NaiveDate;
use rand::{distributions::Alphanumeric, Rng};

use crate::db_types::{GroupId, OperationId};

const ID_LENGTH: usize = 24;

/// Derives the idempotency key for a recurring charge.
///
/// The key is a hash of the subscription id and the billing cycle date, so every billing run for the same cycle,
/// including retries and overlapping runs, produces the same key and can charge at most once.
pub fn billing_cycle_key(subscription_id: &str, billing_date: NaiveDate) -> OperationId {
    let digest = hash_hex(&["billing", subscription_id, &billing_date.format("%Y-%m-%d").to_string()]);
    OperationId(format!("bill_{digest}"))
}

/// Derives the group id for a new chain opened with an idempotency key, so that retries of the opening request land
/// in the same group.
pub fn group_id_for_key(key: &OperationId) -> GroupId {
    GroupId(format!("grp_{}", hash_hex(&["group", key.as_str()])))
}

pub fn new_group_id() -> GroupId {
    GroupId(format!("grp_{}", random_suffix()))
}

pub fn new_operation_id() -> OperationId {
    OperationId(format!("op_{}", random_suffix()))
}

fn random_suffix() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(ID_LENGTH).map(char::from).collect()
}

/// Hex encoding of the first 16 bytes of the Blake2b hash of the NUL-separated parts.
fn hash_hex(parts: &[&str]) -> String {
    let mut hasher = Blake2b512::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hasher.finalize()[..16].iter().map(|b| format!("{b:02x}")).collect()
}
