//! Instruction (Solana) build strategy.

use alloy::primitives::U256;

use crate::builder::transaction::{SystemInstruction, UnsignedTransaction};
use crate::builder::{BuildRequest, BuildStrategy};
use crate::chain::address::parse_instruction_address;
use crate::chain::units::to_u64;
use crate::error::{SendError, SendResult};
use crate::state::ChainState;

/// One System Program transfer; the source always pays the fee.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstructionStrategy;

impl BuildStrategy for InstructionStrategy {
    fn build(&self, request: &BuildRequest, state: &ChainState) -> SendResult<UnsignedTransaction> {
        let chain = request.chain;
        parse_instruction_address(chain, &request.to)?;
        parse_instruction_address(chain, &request.from)?;

        let ChainState::Instruction { blockhash, balance } = state else {
            return Err(SendError::ChainStateUnavailable(format!(
                "expected a recent blockhash for {}",
                chain
            )));
        };

        let lamports = to_u64(request.amount, "amount")?;
        let required = request
            .amount
            .checked_add(request.fee.total_fee)
            .ok_or_else(|| SendError::InvalidAmount("amount plus fee overflows".to_string()))?;
        if required > U256::from(*balance) {
            return Err(SendError::InsufficientFunds {
                required,
                available: U256::from(*balance),
            });
        }

        Ok(UnsignedTransaction::Instruction {
            blockhash: blockhash.clone(),
            fee_payer: request.from.clone(),
            instructions: vec![SystemInstruction::Transfer {
                from: request.from.clone(),
                to: request.to.clone(),
                lamports,
            }],
        })
    }
}
