//! Transaction builder subsystem.
//!
//! # Data Flow
//! ```text
//! BuildRequest (from, to, amount, FeeTerms) + ChainState
//!     → strategy_for(chain.family())
//!         ├── utxo.rs        (first-fit selection, optional change)
//!         ├── account.rs     (nonce + gas price, exact value)
//!         └── instruction.rs (single System transfer, payer = source)
//!     → UnsignedTransaction (transaction.rs)
//! ```
//!
//! # Design Decisions
//! - Strategies are pure: no I/O, no shared state
//! - Destination format is validated before anything is assembled
//! - Fee terms come from an estimate at create time and from the record at
//!   rebuild time, so money fields never drift

pub mod account;
pub mod instruction;
pub mod transaction;
pub mod utxo;

use alloy::primitives::U256;

use crate::chain::{Chain, ChainFamily};
use crate::error::SendResult;
use crate::fees::FeeEstimate;
use crate::state::ChainState;

pub use account::AccountStrategy;
pub use instruction::InstructionStrategy;
pub use transaction::{SystemInstruction, TxOutput, UnsignedTransaction};
pub use utxo::UtxoStrategy;

/// Fee the transaction must pay, fixed for the life of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeTerms {
    /// Total fee in base units.
    pub total_fee: U256,
    /// Wei per gas (account chains).
    pub gas_price: Option<U256>,
    /// Gas limit (account chains).
    pub gas_limit: Option<u64>,
}

impl FeeTerms {
    /// Flat fee with no gas component.
    pub fn flat(total_fee: U256) -> Self {
        Self {
            total_fee,
            gas_price: None,
            gas_limit: None,
        }
    }

    pub fn from_estimate(estimate: &FeeEstimate) -> Self {
        let gas_limit = estimate
            .aux_metadata
            .get("gas_limit")
            .and_then(|limit| limit.parse().ok());
        Self {
            total_fee: estimate.total_fee,
            gas_price: gas_limit.and(estimate.unit_price),
            gas_limit,
        }
    }

    /// Terms recorded in a previously built transaction, with its total fee.
    pub fn from_unsigned(total_fee: U256, unsigned: &UnsignedTransaction) -> Self {
        match unsigned {
            UnsignedTransaction::Account {
                gas_price, gas_limit, ..
            } => Self {
                total_fee,
                gas_price: Some(*gas_price),
                gas_limit: Some(*gas_limit),
            },
            _ => Self::flat(total_fee),
        }
    }
}

/// Inputs to a build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub chain: Chain,
    pub from: String,
    pub to: String,
    /// Amount in base units.
    pub amount: U256,
    pub fee: FeeTerms,
}

/// One construction strategy per chain family.
pub trait BuildStrategy: Send + Sync {
    fn build(&self, request: &BuildRequest, state: &ChainState) -> SendResult<UnsignedTransaction>;
}

pub fn strategy_for(family: ChainFamily) -> &'static dyn BuildStrategy {
    match family {
        ChainFamily::Utxo => &UtxoStrategy,
        ChainFamily::Account => &AccountStrategy,
        ChainFamily::Instruction => &InstructionStrategy,
    }
}

/// Builds `request` with the strategy for its chain.
pub fn build_transaction(request: &BuildRequest, state: &ChainState) -> SendResult<UnsignedTransaction> {
    strategy_for(request.chain.family()).build(request, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::FeeTier;
    use std::collections::BTreeMap;

    #[test]
    fn test_fee_terms_from_gas_estimate() {
        let mut aux = BTreeMap::new();
        aux.insert("gas_limit".to_string(), "21000".to_string());
        let estimate = FeeEstimate {
            tier: FeeTier::Fast,
            per_unit_rate: Some("50".to_string()),
            total_fee: U256::from(1_050_000_000_000_000u64),
            total_fee_decimal: "0.00105".to_string(),
            estimated_confirm_seconds: 15,
            aux_metadata: aux,
            unit_price: Some(U256::from(50_000_000_000u64)),
        };
        let terms = FeeTerms::from_estimate(&estimate);
        assert_eq!(terms.gas_limit, Some(21_000));
        assert_eq!(terms.gas_price, Some(U256::from(50_000_000_000u64)));

        let mut per_byte = estimate.clone();
        per_byte.aux_metadata.clear();
        assert_eq!(FeeTerms::from_estimate(&per_byte), FeeTerms::flat(estimate.total_fee));
    }
}
