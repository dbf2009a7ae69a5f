//! UTXO chain state via an Esplora indexer.

use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;

use crate::blockchain::{BlockchainError, EsploraClient};
use crate::builder::UnsignedTransaction;
use crate::chain::Chain;
use crate::config::BitcoinConfig;
use crate::error::{SendError, SendResult};
use crate::observability::metrics;
use crate::resilience::{retry_if, RetryPolicy};
use crate::state::types::{ChainState, UnspentOutput};
use crate::state::ChainStateReader;

pub struct EsploraStateReader {
    chain: Chain,
    client: EsploraClient,
    parent_retry: RetryPolicy,
}

impl EsploraStateReader {
    pub fn new(client: EsploraClient, config: &BitcoinConfig) -> Self {
        Self {
            chain: config.chain,
            client,
            parent_retry: RetryPolicy::new(
                config.parent_fetch_attempts,
                Duration::from_millis(config.parent_fetch_delay_ms),
            ),
        }
    }

    /// Locking script of `txid:vout`, fetched from the parent transaction.
    async fn locking_script(&self, txid: &str, vout: u32) -> SendResult<String> {
        let parent = retry_if(
            &self.parent_retry,
            "esplora.parent_tx",
            BlockchainError::is_transient,
            |_| self.client.transaction(txid),
        )
        .await?;

        parent
            .vout
            .get(vout as usize)
            .map(|output| output.scriptpubkey.clone())
            .ok_or_else(|| {
                SendError::ChainStateUnavailable(format!("{} has no output {}", txid, vout))
            })
    }

    /// Spendable outputs for `address`, in indexer order.
    ///
    /// Outputs whose parent transaction cannot be resolved after retries are
    /// left out instead of failing the whole listing.
    pub async fn utxos_for(&self, address: &str) -> SendResult<Vec<UnspentOutput>> {
        let listed = self.client.address_utxos(address).await?;
        let mut utxos = Vec::with_capacity(listed.len());

        for candidate in listed {
            match self.locking_script(&candidate.txid, candidate.vout).await {
                Ok(locking_script) => utxos.push(UnspentOutput {
                    txid: candidate.txid,
                    output_index: candidate.vout,
                    value: candidate.value,
                    locking_script,
                }),
                Err(e) => {
                    tracing::warn!(
                        chain = %self.chain,
                        txid = %candidate.txid,
                        vout = candidate.vout,
                        error = %e,
                        "Dropping unspent output with unresolved parent"
                    );
                    metrics::record_utxo_dropped(self.chain);
                }
            }
        }

        tracing::debug!(chain = %self.chain, address, count = utxos.len(), "Fetched unspent outputs");
        Ok(utxos)
    }
}

#[async_trait]
impl ChainStateReader for EsploraStateReader {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn snapshot(&self, address: &str) -> SendResult<ChainState> {
        Ok(ChainState::Utxo {
            utxos: self.utxos_for(address).await?,
        })
    }

    async fn balance(&self, address: &str) -> SendResult<U256> {
        Ok(U256::from(self.client.address_balance(address).await?))
    }

    async fn is_current(&self, _address: &str, unsigned: &UnsignedTransaction) -> SendResult<bool> {
        let UnsignedTransaction::Utxo { inputs, .. } = unsigned else {
            return Err(SendError::UnsupportedChain(self.chain));
        };
        for input in inputs {
            let outspend = self.client.outspend(&input.txid, input.output_index).await?;
            if outspend.spent {
                tracing::info!(
                    chain = %self.chain,
                    txid = %input.txid,
                    vout = input.output_index,
                    "Selected output already spent"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}
