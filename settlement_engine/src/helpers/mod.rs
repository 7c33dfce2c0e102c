mod identifiers;

pub use identifiers::{billing_cycle_key, group_id_for_key, new_group_id, new_operation_id};
