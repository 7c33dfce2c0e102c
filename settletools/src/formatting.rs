use std::fmt::Write;

use anyhow::Result;
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};
use settlement_engine::{
    db_types::{GroupId, Operation},
    ledger::GroupState,
    GroupHistory,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

pub fn format_group_history(history: &GroupHistory) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Group {}\n{:>4} records", history.group_id, history.operations.len())?;
    writeln!(f, "===============================================================================")?;
    writeln!(f, "{}", format_operations(&history.operations))?;
    write!(f, "{}", format_group_state(&history.group_id, &history.state)?)?;
    Ok(f)
}

pub fn format_operations(operations: &[Operation]) -> String {
    let mut table = Table::new();
    table.set_titles(row!["#", "Id", "Type", "Target", "Amount", "Outcome", "Parent", "Token", "Created At"]);
    for op in operations {
        table.add_row(row![
            op.seq,
            op.id,
            op.operation_type,
            op.void_target().map(|t| t.to_string()).unwrap_or_default(),
            op.amount,
            op.outcome,
            op.parent_id.as_ref().map(|p| p.to_string()).unwrap_or_default(),
            op.gateway_token,
            op.created_at.to_string()
        ]);
    }
    markdown_style(&mut table);
    format!("{table}")
}

pub fn format_group_state(group_id: &GroupId, state: &GroupState) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "State of group {group_id}")?;
    writeln!(f, "-----------------------------------------------------------------------------")?;
    match &state.active_authorization_id {
        Some(id) => writeln!(f, "Active authorization: {id} for {}", state.active_authorization_amount)?,
        None if state.is_authorization_voided => writeln!(f, "Active authorization: none (voided)")?,
        None => writeln!(f, "Active authorization: none")?,
    }
    writeln!(f, "Captured:           {}", state.captured_amount)?;
    writeln!(f, "Refunded:           {}", state.refunded_amount)?;
    writeln!(f, "Left to capture:    {}", state.remaining_authorized())?;
    writeln!(f, "Left to refund:     {}", state.remaining_refundable())?;
    Ok(f)
}

pub fn format_operation(op: &Operation) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "Operation {id:24} Created {created}", id = op.id.to_string(), created = op.created_at)?;
    writeln!(f, "Group: {}   Merchant: {}", op.group_id, op.merchant_id)?;
    writeln!(f, "[{:^15}] {} of {}", op.outcome.to_string(), op.operation_type, op.amount)?;
    writeln!(f, "-----------------------------------------------------------------------------")?;
    writeln!(f, "Parent:    {}", op.parent_id.as_ref().map(|p| p.to_string()).unwrap_or_else(|| "None".into()))?;
    writeln!(f, "Token:     {}", op.gateway_token)?;
    writeln!(f, "Reference: {}", op.gateway_reference.as_deref().unwrap_or("None"))?;
    writeln!(f, "Customer:  {}", op.customer_id.as_deref().unwrap_or("None"))?;
    for (k, v) in op.metadata.iter() {
        writeln!(f, "  {k}: {v}")?;
    }
    Ok(f)
}
