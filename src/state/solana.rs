//! Instruction chain state via Solana JSON-RPC.

use alloy::primitives::U256;
use async_trait::async_trait;

use crate::blockchain::SolanaRpcClient;
use crate::builder::UnsignedTransaction;
use crate::chain::Chain;
use crate::error::{SendError, SendResult};
use crate::state::types::ChainState;
use crate::state::ChainStateReader;

pub struct SolanaStateReader {
    client: SolanaRpcClient,
}

impl SolanaStateReader {
    pub fn new(client: SolanaRpcClient) -> Self {
        Self { client }
    }

    /// Most recent finalized blockhash.
    pub async fn latest_block_ref(&self) -> SendResult<String> {
        Ok(self.client.get_latest_blockhash().await?)
    }
}

#[async_trait]
impl ChainStateReader for SolanaStateReader {
    fn chain(&self) -> Chain {
        Chain::Solana
    }

    async fn snapshot(&self, address: &str) -> SendResult<ChainState> {
        let blockhash = self.latest_block_ref().await?;
        let balance = self.client.get_balance(address).await?;
        tracing::debug!(chain = %Chain::Solana, address, blockhash = %blockhash, "Read instruction chain state");
        Ok(ChainState::Instruction { blockhash, balance })
    }

    async fn balance(&self, address: &str) -> SendResult<U256> {
        Ok(U256::from(self.client.get_balance(address).await?))
    }

    async fn is_current(&self, _address: &str, unsigned: &UnsignedTransaction) -> SendResult<bool> {
        let UnsignedTransaction::Instruction { blockhash, .. } = unsigned else {
            return Err(SendError::UnsupportedChain(Chain::Solana));
        };
        Ok(self.client.is_blockhash_valid(blockhash).await?)
    }
}
