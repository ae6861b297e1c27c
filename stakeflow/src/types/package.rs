use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::config::TokenDecimals;
use crate::utils::format_amount;

/// Terms of one package as stored by the sale contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageTerms {
    /// Settlement-token amount paid, in the token's smallest unit.
    pub required_in: U256,
    /// Stake-token amount minted and staked, in the token's smallest unit.
    pub mint_out: U256,
    pub active: bool,
}

/// A purchasable package, keyed by its index in the sale contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: u64,
    pub required_in: U256,
    pub mint_out: U256,
    pub active: bool,
}

impl Package {
    pub fn from_terms(id: u64, terms: PackageTerms) -> Self {
        Self {
            id,
            required_in: terms.required_in,
            mint_out: terms.mint_out,
            active: terms.active,
        }
    }

    /// One-line human description, e.g. `package #0: pay 100.0 → get 50.0`.
    pub fn describe(&self, decimals: TokenDecimals) -> String {
        let mut line = format!(
            "package #{}: pay {} → get {}",
            self.id,
            format_amount(self.required_in, decimals.settlement),
            format_amount(self.mint_out, decimals.stake),
        );
        if !self.active {
            line.push_str(" (inactive)");
        }
        line
    }
}
