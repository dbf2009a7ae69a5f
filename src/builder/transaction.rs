//! Unsigned transaction model, one variant per chain family.

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::chain::ChainFamily;
use crate::state::UnspentOutput;

/// Output of a UTXO transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub value: u64,
}

/// System Program instructions the engine emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SystemInstruction {
    Transfer { from: String, to: String, lamports: u64 },
}

/// Chain-tagged transaction ready for signing.
///
/// Built fresh for every attempt; a fee or nonce change means a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum UnsignedTransaction {
    Utxo {
        inputs: Vec<UnspentOutput>,
        outputs: Vec<TxOutput>,
        change_address: Option<String>,
    },
    Account {
        chain_id: u64,
        nonce: u64,
        /// Wei per gas.
        gas_price: U256,
        gas_limit: u64,
        to: Address,
        value: U256,
        data: Bytes,
    },
    Instruction {
        blockhash: String,
        fee_payer: String,
        instructions: Vec<SystemInstruction>,
    },
}

impl UnsignedTransaction {
    pub fn family(&self) -> ChainFamily {
        match self {
            UnsignedTransaction::Utxo { .. } => ChainFamily::Utxo,
            UnsignedTransaction::Account { .. } => ChainFamily::Account,
            UnsignedTransaction::Instruction { .. } => ChainFamily::Instruction,
        }
    }

    /// Chain reference the transaction is pinned to: the nonce, the
    /// blockhash, or the spent outpoints.
    pub fn nonce_or_blockhash(&self) -> String {
        match self {
            UnsignedTransaction::Utxo { inputs, .. } => inputs
                .iter()
                .map(|i| format!("{}:{}", i.txid, i.output_index))
                .collect::<Vec<_>>()
                .join(","),
            UnsignedTransaction::Account { nonce, .. } => nonce.to_string(),
            UnsignedTransaction::Instruction { blockhash, .. } => blockhash.clone(),
        }
    }
}
