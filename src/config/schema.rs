//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::chain::Chain;

/// Root configuration for the send engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// UTXO chain (Esplora-compatible indexer).
    pub bitcoin: BitcoinConfig,

    /// EVM-compatible chains, one entry per chain.
    pub evm: Vec<EvmChainConfig>,

    /// Instruction chain (Solana JSON-RPC).
    pub solana: SolanaConfig,

    /// Broadcast retry settings.
    pub broadcast: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Record persistence used by the binary.
    pub store: StoreConfig,

    /// Wallets known to the binary.
    pub wallets: Vec<WalletConfig>,
}

/// Per-tier values, slow to fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TierValues {
    pub slow: u64,
    pub normal: u64,
    pub fast: u64,
}

impl TierValues {
    pub fn is_monotonic(&self) -> bool {
        self.slow <= self.normal && self.normal <= self.fast
    }
}

/// Esplora-backed UTXO chain settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BitcoinConfig {
    /// Enable the UTXO chain.
    pub enabled: bool,

    /// `bitcoin` or `bitcoin_testnet`.
    pub chain: Chain,

    /// Indexer base URL (e.g., "https://blockstream.info/api").
    pub esplora_url: String,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Assumed transaction size used to turn a fee rate into a fee.
    pub avg_tx_size_bytes: u64,

    /// Confirmation-target buckets (in blocks) for each tier.
    pub confirmation_targets: TierValues,

    /// Attempts when resolving an output's parent transaction.
    pub parent_fetch_attempts: u32,

    /// Linear backoff step between parent fetch attempts.
    pub parent_fetch_delay_ms: u64,

    /// Static fee rates used when the indexer is unreachable (sat/byte).
    pub fallback_sat_per_byte: TierValues,
}

impl Default for BitcoinConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chain: Chain::Bitcoin,
            esplora_url: "https://blockstream.info/api".to_string(),
            request_timeout_secs: 15,
            avg_tx_size_bytes: 226,
            confirmation_targets: TierValues {
                slow: 144,
                normal: 6,
                fast: 2,
            },
            parent_fetch_attempts: 3,
            parent_fetch_delay_ms: 250,
            fallback_sat_per_byte: TierValues {
                slow: 2,
                normal: 8,
                fast: 20,
            },
        }
    }
}

/// EVM-compatible chain settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvmChainConfig {
    /// `ethereum`, `polygon` or `bsc`.
    pub chain: Chain,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Etherscan-compatible gas oracle URL; node gas price is used when absent.
    pub gas_oracle_url: Option<String>,

    /// API key appended to gas oracle requests.
    pub gas_oracle_api_key: Option<String>,

    /// Gas limit of a plain value transfer.
    pub gas_limit: u64,

    /// Static gas prices in gwei used when the oracle is unreachable.
    pub fallback_gwei: TierValues,
}

impl Default for EvmChainConfig {
    fn default() -> Self {
        Self {
            chain: Chain::Ethereum,
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 1,
            rpc_timeout_secs: 10,
            gas_oracle_url: None,
            gas_oracle_api_key: None,
            gas_limit: 21_000,
            fallback_gwei: TierValues {
                slow: 20,
                normal: 30,
                fast: 50,
            },
        }
    }
}

/// Solana JSON-RPC settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolanaConfig {
    /// Enable the instruction chain.
    pub enabled: bool,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Network fee charged per signature.
    pub lamports_per_signature: u64,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            request_timeout_secs: 10,
            lamports_per_signature: 5_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Linear backoff step in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay between attempts in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the pretty format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Record store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file holding send records.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "send-records.json".to_string(),
        }
    }
}

/// A wallet the binary can send from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
    /// Wallet identifier passed to the signing oracle.
    pub id: String,

    /// Chain the wallet lives on.
    pub chain: Chain,

    /// Source address; must match the key the oracle returns.
    pub address: String,
}

impl EngineConfig {
    /// Settings for an EVM chain, if configured.
    pub fn evm_chain(&self, chain: Chain) -> Option<&EvmChainConfig> {
        self.evm.iter().find(|c| c.chain == chain)
    }

    /// Whether the engine has services for `chain`.
    pub fn is_configured(&self, chain: Chain) -> bool {
        match chain {
            Chain::Bitcoin | Chain::BitcoinTestnet => {
                self.bitcoin.enabled && self.bitcoin.chain == chain
            }
            Chain::Solana => self.solana.enabled,
            _ => self.evm_chain(chain).is_some(),
        }
    }
}
