//! Account (EVM) build strategy.

use alloy::primitives::{Bytes, U256};

use crate::builder::transaction::UnsignedTransaction;
use crate::builder::{BuildRequest, BuildStrategy};
use crate::chain::address::parse_account_address;
use crate::error::{SendError, SendResult};
use crate::state::ChainState;

/// Gas for a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Value transfer at the nonce read for this build.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountStrategy;

impl BuildStrategy for AccountStrategy {
    fn build(&self, request: &BuildRequest, state: &ChainState) -> SendResult<UnsignedTransaction> {
        let chain = request.chain;
        let to = parse_account_address(chain, &request.to)?;
        parse_account_address(chain, &request.from)?;

        let ChainState::Account {
            chain_id,
            nonce,
            balance,
        } = state
        else {
            return Err(SendError::ChainStateUnavailable(format!(
                "expected account state for {}",
                chain
            )));
        };

        let gas_limit = request.fee.gas_limit.unwrap_or(TRANSFER_GAS_LIMIT);
        let gas_price = request
            .fee
            .gas_price
            .unwrap_or_else(|| request.fee.total_fee / U256::from(gas_limit.max(1)));

        // The fee is paid on top of the value, never deducted from it.
        let required = request
            .amount
            .checked_add(request.fee.total_fee)
            .ok_or_else(|| SendError::InvalidAmount("amount plus fee overflows".to_string()))?;
        if required > *balance {
            return Err(SendError::InsufficientFunds {
                required,
                available: *balance,
            });
        }

        tracing::debug!(chain = %chain, nonce, gas_limit, "Built account transaction");

        Ok(UnsignedTransaction::Account {
            chain_id: *chain_id,
            nonce: *nonce,
            gas_price,
            gas_limit,
            to,
            value: request.amount,
            data: Bytes::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FeeTerms;
    use crate::chain::Chain;

    const FROM: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const TO: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    fn request(amount: u64) -> BuildRequest {
        BuildRequest {
            chain: Chain::Ethereum,
            from: FROM.to_string(),
            to: TO.to_string(),
            amount: U256::from(amount),
            fee: FeeTerms {
                total_fee: U256::from(21_000u64 * 10),
                gas_price: Some(U256::from(10u64)),
                gas_limit: Some(21_000),
            },
        }
    }

    fn state(balance: u64) -> ChainState {
        ChainState::Account {
            chain_id: 1,
            nonce: 7,
            balance: U256::from(balance),
        }
    }

    #[test]
    fn test_value_is_exact_amount() {
        let tx = AccountStrategy.build(&request(1_000_000), &state(2_000_000)).unwrap();
        let UnsignedTransaction::Account {
            nonce,
            value,
            gas_price,
            gas_limit,
            chain_id,
            to,
            ..
        } = tx
        else {
            panic!("expected an account transaction");
        };
        assert_eq!(nonce, 7);
        assert_eq!(chain_id, 1);
        assert_eq!(value, U256::from(1_000_000u64));
        assert_eq!(gas_price, U256::from(10u64));
        assert_eq!(gas_limit, 21_000);
        assert_eq!(to.to_checksum(None), TO);
    }

    #[test]
    fn test_fee_counts_against_balance() {
        // 1_000_000 + 210_000 > 1_100_000
        let err = AccountStrategy.build(&request(1_000_000), &state(1_100_000)).unwrap_err();
        assert!(matches!(err, SendError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_gas_price_derived_without_terms() {
        let mut req = request(1);
        req.fee = FeeTerms::flat(U256::from(42_000u64));
        let tx = AccountStrategy.build(&req, &state(1_000_000)).unwrap();
        assert!(matches!(tx, UnsignedTransaction::Account { gas_price, .. } if gas_price == U256::from(2u64)));
    }

    #[test]
    fn test_bad_checksum_is_invalid_address() {
        let mut req = request(1);
        req.to = "0x52908400098527886E0F7030069857D2E4169Ee7".to_string();
        assert!(matches!(
            AccountStrategy.build(&req, &state(1_000_000)),
            Err(SendError::InvalidAddress { .. })
        ));
    }
}
