use alloy_primitives::utils::format_units;
use alloy_primitives::{Address, U256};

use crate::error::{FlowError, Result};

/// Decode a hex string (with optional `0x` prefix) to bytes.
///
/// # Errors
///
/// Returns `FlowError::Validation` if the hex string is invalid.
pub fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|e| FlowError::Validation(format!("invalid hex string: {e}")))
}

/// Parse an account address the way wallets accept one.
///
/// Accepts 40 hex digits with an optional lowercase `0x` prefix. All-lowercase
/// and all-uppercase input is taken as-is; mixed case must carry a valid
/// EIP-55 checksum. Anything else yields `None`.
pub fn parse_address(raw: &str) -> Option<Address> {
    let body = raw.strip_prefix("0x").unwrap_or(raw);
    if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let bytes = hex::decode(body).ok()?;
    let address = Address::from_slice(&bytes);

    let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper && &address.to_checksum(None)[2..] != body {
        return None;
    }

    Some(address)
}

/// EIP-55 checksummed form of an address.
pub fn checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Abbreviated address for logs and status lines (`0x1234...abcd`).
pub fn short_address(address: &Address) -> String {
    let full = checksum(address);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Parse a JSON-RPC hex quantity (`0x38`) into a `u64`.
pub fn parse_quantity(value: &str) -> Result<u64> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| FlowError::Validation(format!("quantity without 0x prefix: {value}")))?;
    if digits.is_empty() {
        return Err(FlowError::Validation("empty quantity".into()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| FlowError::Validation(format!("invalid quantity {value}: {e}")))
}

/// Encode a `u64` as a JSON-RPC hex quantity.
pub fn to_quantity(value: u64) -> String {
    format!("{value:#x}")
}

/// Render a raw token amount with the given decimals (`1500000` @ 6 -> `1.500000`).
pub fn format_amount(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}
