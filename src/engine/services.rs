//! Per-chain service wiring.
//!
//! Each configured chain gets its own fee estimator, state reader and
//! broadcaster, owning their own clients.

use std::collections::HashMap;
use std::sync::Arc;

use crate::blockchain::{EsploraClient, EvmClient, SolanaRpcClient};
use crate::broadcast::{Broadcaster, EsploraTransport, EvmTransport, SolanaTransport};
use crate::chain::Chain;
use crate::config::{BitcoinConfig, EngineConfig, EvmChainConfig, RetryConfig, SolanaConfig};
use crate::error::SendResult;
use crate::fees::{EsploraFeeSource, EtherscanGasOracle, FeeEstimator, FeeSource, NodeGasPrice};
use crate::resilience::RetryPolicy;
use crate::state::{ChainStateReader, EsploraStateReader, EvmStateReader, SolanaStateReader};

/// Services the engine uses for one chain.
#[derive(Clone)]
pub struct ChainServices {
    pub estimator: Arc<FeeEstimator>,
    pub reader: Arc<dyn ChainStateReader>,
    pub broadcaster: Broadcaster,
}

impl ChainServices {
    pub fn new(estimator: FeeEstimator, reader: Arc<dyn ChainStateReader>, broadcaster: Broadcaster) -> Self {
        Self {
            estimator: Arc::new(estimator),
            reader,
            broadcaster,
        }
    }

    pub fn bitcoin(config: &BitcoinConfig, retry: &RetryConfig) -> SendResult<Self> {
        let client = EsploraClient::new(config)?;
        let source: Arc<dyn FeeSource> =
            Arc::new(EsploraFeeSource::new(client.clone(), config.confirmation_targets));

        Ok(Self::new(
            FeeEstimator::bitcoin(config, Some(source)),
            Arc::new(EsploraStateReader::new(client.clone(), config)),
            Broadcaster::new(
                Arc::new(EsploraTransport::new(config.chain, client)),
                RetryPolicy::from(retry),
            ),
        ))
    }

    /// Connects to the chain's RPC endpoints; an unreachable node is logged,
    /// not fatal.
    pub async fn evm(config: &EvmChainConfig, retry: &RetryConfig) -> SendResult<Self> {
        let client = EvmClient::new(config).await?;
        let source: Arc<dyn FeeSource> = match &config.gas_oracle_url {
            Some(url) => Arc::new(EtherscanGasOracle::new(
                url.clone(),
                config.gas_oracle_api_key.clone(),
                config.rpc_timeout_secs,
            )?),
            None => Arc::new(NodeGasPrice::new(client.clone())),
        };

        Ok(Self::new(
            FeeEstimator::evm(config, Some(source)),
            Arc::new(EvmStateReader::new(client.clone())),
            Broadcaster::new(Arc::new(EvmTransport::new(client)), RetryPolicy::from(retry)),
        ))
    }

    pub fn solana(config: &SolanaConfig, retry: &RetryConfig) -> SendResult<Self> {
        let client = SolanaRpcClient::new(config)?;

        Ok(Self::new(
            FeeEstimator::solana(config),
            Arc::new(SolanaStateReader::new(client.clone())),
            Broadcaster::new(Arc::new(SolanaTransport::new(client)), RetryPolicy::from(retry)),
        ))
    }
}

impl std::fmt::Debug for ChainServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainServices")
            .field("chain", &self.reader.chain())
            .field("broadcaster", &self.broadcaster)
            .finish()
    }
}

/// Services for every chain enabled in `config`.
pub async fn services_from_config(config: &EngineConfig) -> SendResult<HashMap<Chain, ChainServices>> {
    let mut services = HashMap::new();

    if config.bitcoin.enabled {
        services.insert(config.bitcoin.chain, ChainServices::bitcoin(&config.bitcoin, &config.broadcast)?);
    }
    for evm in &config.evm {
        services.insert(evm.chain, ChainServices::evm(evm, &config.broadcast).await?);
    }
    if config.solana.enabled {
        services.insert(Chain::Solana, ChainServices::solana(&config.solana, &config.broadcast)?);
    }

    tracing::info!(chains = ?services.keys().collect::<Vec<_>>(), "Chain services ready");
    Ok(services)
}
