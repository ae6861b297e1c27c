use std::io::Write;

use serde_json::{json, Map, Value};
use stakeflow::utils::{checksum, format_amount};
use stakeflow::{
    AllowanceView, ApprovalOutcome, FlowSnapshot, PurchaseReceipt, PurchaseStage, Session,
    SessionChange, TokenDecimals, TxReceipt,
};

/// Write one record as a TSV line or a JSON object line.
///
/// Field order is the TSV column order.
fn emit<W: Write>(writer: &mut W, json_mode: bool, fields: &[(&str, Value)]) -> std::io::Result<()> {
    let mut line = String::new();
    if json_mode {
        let object: Map<String, Value> = fields
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        line.push_str(&Value::Object(object).to_string());
    } else {
        for (i, (_, value)) in fields.iter().enumerate() {
            if i > 0 {
                line.push('\t');
            }
            match value {
                Value::String(s) => line.push_str(s),
                Value::Null => line.push('-'),
                other => line.push_str(&other.to_string()),
            }
        }
    }
    line.push('\n');
    writer.write_all(line.as_bytes())?;
    writer.flush()
}

fn receipt_fields(receipt: &TxReceipt) -> [(&'static str, Value); 2] {
    [
        ("hash", json!(receipt.hash.to_string())),
        ("block", json!(receipt.block_number)),
    ]
}

/// One line per package: id, price, output, active, selected, description.
pub fn write_packages<W: Write>(
    writer: &mut W,
    snapshot: &FlowSnapshot,
    decimals: TokenDecimals,
    json_mode: bool,
) -> std::io::Result<()> {
    for package in &snapshot.packages {
        emit(
            writer,
            json_mode,
            &[
                ("id", json!(package.id)),
                ("requiredIn", json!(format_amount(package.required_in, decimals.settlement))),
                ("mintOut", json!(format_amount(package.mint_out, decimals.stake))),
                ("active", json!(package.active)),
                ("selected", json!(snapshot.selected == Some(package.id))),
                ("description", json!(package.describe(decimals))),
            ],
        )?;
    }
    Ok(())
}

pub fn write_allowance<W: Write>(
    writer: &mut W,
    view: &AllowanceView,
    decimals: TokenDecimals,
    json_mode: bool,
) -> std::io::Result<()> {
    emit(
        writer,
        json_mode,
        &[
            ("owner", json!(checksum(&view.state.owner))),
            ("spender", json!(checksum(&view.state.spender))),
            ("allowance", json!(format_amount(view.state.amount, decimals.settlement))),
            ("required", json!(format_amount(view.required, decimals.settlement))),
            ("decision", json!(format!("{:?}", view.decision))),
        ],
    )
}

pub fn write_approval<W: Write>(
    writer: &mut W,
    outcome: &ApprovalOutcome,
    json_mode: bool,
) -> std::io::Result<()> {
    let [hash, block] = receipt_fields(&outcome.receipt);
    let allowance = outcome
        .allowance
        .map(|state| json!(state.amount.to_string()))
        .unwrap_or(Value::Null);
    emit(
        writer,
        json_mode,
        &[("action", json!("approve")), hash, block, ("allowance", allowance)],
    )
}

pub fn write_purchase<W: Write>(
    writer: &mut W,
    purchase: &PurchaseReceipt,
    stages: &[PurchaseStage],
    json_mode: bool,
) -> std::io::Result<()> {
    let [hash, block] = receipt_fields(&purchase.receipt);
    let stages: Vec<String> = stages.iter().map(|s| format!("{s:?}")).collect();
    emit(
        writer,
        json_mode,
        &[
            ("action", json!("buy")),
            ("packageId", json!(purchase.intent.package_id)),
            ("referrer", json!(checksum(&purchase.intent.referrer))),
            hash,
            block,
            ("sessionChanged", json!(purchase.session_changed)),
            ("stages", json!(stages.join(">"))),
        ],
    )
}

pub fn write_link<W: Write>(writer: &mut W, link: &str, json_mode: bool) -> std::io::Result<()> {
    emit(writer, json_mode, &[("link", json!(link))])
}

/// A session change caused by a wallet notification.
pub fn write_change<W: Write>(
    writer: &mut W,
    change: &SessionChange,
    session: &Session,
    json_mode: bool,
) -> std::io::Result<()> {
    let (kind, account) = match change {
        SessionChange::Unchanged => ("unchanged", None),
        SessionChange::AccountSwitched(account) => ("accountSwitched", Some(*account)),
        SessionChange::Disconnected => ("disconnected", None),
        SessionChange::ReloadRequired => ("reloadRequired", None),
        SessionChange::ReconnectRequired => ("reconnectRequired", None),
    };
    emit(
        writer,
        json_mode,
        &[
            ("change", json!(kind)),
            ("account", account.map(|a| json!(checksum(&a))).unwrap_or(Value::Null)),
            ("status", json!(format!("{:?}", session.status()))),
            ("epoch", json!(session.epoch())),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(json_mode: bool, fields: &[(&str, Value)]) -> String {
        let mut out = Vec::new();
        emit(&mut out, json_mode, fields).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_emit_tsv() {
        let line = render(
            false,
            &[("id", json!(1)), ("name", json!("basic")), ("extra", Value::Null)],
        );
        assert_eq!(line, "1\tbasic\t-\n");
    }

    #[test]
    fn test_emit_json() {
        let line = render(true, &[("id", json!(1)), ("active", json!(true))]);
        let parsed: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed["id"], 1);
        assert_eq!(parsed["active"], true);
    }

    #[test]
    fn test_write_change_disconnected() {
        let mut out = Vec::new();
        write_change(
            &mut out,
            &SessionChange::Disconnected,
            &Session::default(),
            false,
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "disconnected\t-\tDisconnected\t0\n");
    }
}
