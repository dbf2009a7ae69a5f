//! Chain state snapshots handed to the builder.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// A spendable output on the UTXO chain.
///
/// Fetched once, never mutated; spending it is observed as its absence from
/// the next listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub txid: String,
    pub output_index: u32,
    pub value: u64,
    /// Locking script of the output, hex.
    pub locking_script: String,
}

/// Facts read from a chain immediately before building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainState {
    Utxo {
        /// Candidates in provider order.
        utxos: Vec<UnspentOutput>,
    },
    Account {
        chain_id: u64,
        nonce: u64,
        balance: U256,
    },
    Instruction {
        /// Base58 recent blockhash.
        blockhash: String,
        balance: u64,
    },
}

impl ChainState {
    /// Spendable total in base units.
    pub fn spendable(&self) -> U256 {
        match self {
            ChainState::Utxo { utxos } => utxos
                .iter()
                .fold(U256::ZERO, |acc, u| acc + U256::from(u.value)),
            ChainState::Account { balance, .. } => *balance,
            ChainState::Instruction { balance, .. } => U256::from(*balance),
        }
    }
}
