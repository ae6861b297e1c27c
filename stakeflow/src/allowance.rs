//! Settlement-token allowance gating.
//!
//! Every decision re-reads the allowance on chain; nothing here is cached,
//! since the allowance can be revoked or spent outside this client.

use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{info, warn};

use crate::contracts::SettlementToken;
use crate::error::{FlowError, Result};
use crate::slot::WriteSlot;
use crate::types::TxReceipt;
use crate::utils::short_address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GateDecision {
    Sufficient,
    Insufficient,
}

/// Point-in-time allowance read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllowanceState {
    pub owner: Address,
    pub spender: Address,
    pub amount: U256,
}

impl AllowanceState {
    pub fn decide(&self, required: U256) -> GateDecision {
        if self.amount >= required {
            GateDecision::Sufficient
        } else {
            GateDecision::Insufficient
        }
    }
}

/// Result of a confirmed approval.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub receipt: TxReceipt,
    /// Allowance re-read after confirmation; `None` if that read failed.
    pub allowance: Option<AllowanceState>,
}

pub struct AllowanceGate<'a, T> {
    token: &'a T,
    slot: &'a WriteSlot,
}

impl<'a, T: SettlementToken> AllowanceGate<'a, T> {
    pub fn new(token: &'a T, slot: &'a WriteSlot) -> Self {
        Self { token, slot }
    }

    pub async fn read(&self, owner: Address, spender: Address) -> Result<AllowanceState> {
        let amount = self.token.allowance(owner, spender).await?;
        Ok(AllowanceState {
            owner,
            spender,
            amount,
        })
    }

    /// `Sufficient` iff the current allowance is at least `required`.
    pub async fn check(
        &self,
        owner: Address,
        spender: Address,
        required: U256,
    ) -> Result<GateDecision> {
        Ok(self.read(owner, spender).await?.decide(required))
    }

    /// Approve `spender` for `U256::MAX` and wait for confirmation.
    ///
    /// A maximal approval means one approval covers every package; the standing
    /// allowance is correspondingly unbounded.
    pub async fn approve(&self, owner: Address, spender: Address) -> Result<ApprovalOutcome> {
        let _guard = self.slot.try_acquire()?;

        info!(
            owner = %short_address(&owner),
            spender = %short_address(&spender),
            "submitting max approval"
        );
        let pending = self
            .token
            .approve(owner, spender, U256::MAX)
            .await
            .map_err(|e| FlowError::ApprovalFailed(e.detail()))?;
        let receipt = self
            .token
            .confirm(&pending)
            .await
            .map_err(|e| FlowError::ApprovalFailed(e.detail()))?;
        info!(block = receipt.block_number, "approval confirmed");

        let allowance = match self.read(owner, spender).await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(error = %e, "allowance refresh after approval failed");
                None
            }
        };

        Ok(ApprovalOutcome { receipt, allowance })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(amount: u64) -> AllowanceState {
        AllowanceState {
            owner: Address::repeat_byte(0xaa),
            spender: Address::repeat_byte(0x55),
            amount: U256::from(amount),
        }
    }

    #[test]
    fn test_decide_boundary() {
        let required = U256::from(100u64);
        assert_eq!(state(99).decide(required), GateDecision::Insufficient);
        assert_eq!(state(100).decide(required), GateDecision::Sufficient);
        assert_eq!(state(101).decide(required), GateDecision::Sufficient);
    }

    #[test]
    fn test_decide_zero_requirement() {
        assert_eq!(state(0).decide(U256::ZERO), GateDecision::Sufficient);
    }

    #[test]
    fn test_max_allowance_covers_anything() {
        let max = AllowanceState {
            amount: U256::MAX,
            ..state(0)
        };
        assert_eq!(max.decide(U256::MAX), GateDecision::Sufficient);
    }
}
