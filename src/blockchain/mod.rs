//! Remote chain API clients.
//!
//! # Data Flow
//! ```text
//! config.rs sections
//!     → client.rs   (EVM JSON-RPC via alloy, failover + timeouts)
//!     → esplora.rs  (UTXO indexer REST via reqwest)
//!     → solana.rs   (Solana JSON-RPC via reqwest)
//!     → consumed by fees / state / broadcast
//! ```
//!
//! # Design Decisions
//! - Clients are owned service instances, injected where needed
//! - Every call carries a timeout; retries are the caller's concern
//! - Never log key material or signed payloads

pub mod client;
pub mod esplora;
pub mod solana;
pub mod types;

pub use client::EvmClient;
pub use esplora::EsploraClient;
pub use solana::SolanaRpcClient;
pub use types::{BlockchainError, BlockchainResult, ChainId};
