//! EVM JSON-RPC client with timeout, failover and error mapping.
//!
//! # Responsibilities
//! - Connect to a primary JSON-RPC endpoint plus failovers
//! - Query account state (nonce, balance, gas price, transaction lookup)
//! - Submit raw signed transactions
//! - Handle timeouts and network errors gracefully

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::transports::{RpcError, TransportError, TransportErrorKind, TransportResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId};
use crate::config::EvmChainConfig;

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// EVM RPC client wrapper with failover support.
#[derive(Clone)]
pub struct EvmClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Configuration.
    config: EvmChainConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

/// Map an alloy transport error onto the shared remote error type.
pub(crate) fn map_rpc_error(error: TransportError) -> BlockchainError {
    match error {
        RpcError::ErrorResp(payload) => BlockchainError::Rejected {
            status: None,
            message: payload.message.to_string(),
        },
        RpcError::Transport(TransportErrorKind::HttpError(http)) => BlockchainError::Rejected {
            status: Some(http.status),
            message: http.body,
        },
        RpcError::NullResp => BlockchainError::NotFound("null response".to_string()),
        other => BlockchainError::Rpc(other.to_string()),
    }
}

impl EvmClient {
    /// Create a new client.
    ///
    /// Client creation succeeds even if the RPC is unreachable; a chain ID
    /// mismatch is logged and surfaces again on first use.
    pub async fn new(config: &EvmChainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    chain = %config.chain,
                    rpc_url = %config.rpc_url,
                    chain_id = config.chain_id,
                    "EVM client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    chain = %config.chain,
                    error = %e,
                    "EVM client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Runs `op` against each provider in order until one answers.
    async fn with_failover<T, F, Fut>(&self, method: &'static str, op: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = None;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, op(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, method, error = %e, "RPC error, trying next provider");
                    last_error = Some(map_rpc_error(e));
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, method, "RPC timeout, trying next provider");
                    last_error = Some(BlockchainError::Timeout(self.config.rpc_timeout_secs));
                }
            }
        }
        Err(BlockchainError::Rpc(format!(
            "All RPC providers failed ({}): {}",
            method,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Get the balance of an address in wei.
    pub async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.with_failover("eth_getBalance", |p| async move { p.get_balance(address).await })
            .await
    }

    /// Get the transaction count (nonce) for an address.
    pub async fn get_transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.with_failover("eth_getTransactionCount", |p| async move {
            p.get_transaction_count(address).await
        })
        .await
    }

    /// Get current gas price in wei.
    pub async fn get_gas_price(&self) -> BlockchainResult<u128> {
        self.with_failover("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
    }

    /// Whether any provider knows the transaction (mempool or mined).
    pub async fn transaction_exists(&self, tx_hash: TxHash) -> BlockchainResult<bool> {
        self.with_failover("eth_getTransactionByHash", |p| async move {
            p.get_transaction_by_hash(tx_hash).await.map(|tx| tx.is_some())
        })
        .await
    }

    /// Submit a signed transaction.
    ///
    /// Failover only happens on transport-level failures; a node that
    /// answers with a JSON-RPC error has made a decision about the payload
    /// and that answer is returned as [`BlockchainError::Rejected`].
    pub async fn send_raw_transaction(&self, raw: &Bytes) -> BlockchainResult<TxHash> {
        let mut last_error = BlockchainError::Rpc("no RPC providers configured".to_string());
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.send_raw_transaction(raw)).await {
                Ok(Ok(pending)) => return Ok(*pending.tx_hash()),
                Ok(Err(e)) => {
                    let mapped = map_rpc_error(e);
                    if let BlockchainError::Rejected { status: None, .. } = mapped {
                        return Err(mapped);
                    }
                    tracing::warn!(provider_idx = i, error = %mapped, "Broadcast failed, trying next provider");
                    last_error = mapped;
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, "Broadcast timeout, trying next provider");
                    last_error = BlockchainError::Timeout(self.config.rpc_timeout_secs);
                }
            }
        }
        Err(last_error)
    }

    /// Get the configuration.
    pub fn config(&self) -> &EvmChainConfig {
        &self.config
    }
}

impl std::fmt::Debug for EvmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmClient")
            .field("chain", &self.config.chain)
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("providers", &self.providers.len())
            .finish()
    }
}
