//! Chain state reader subsystem.
//!
//! # Data Flow
//! ```text
//! engine.create_send / rebuild
//!     → ChainStateReader::snapshot(address)   (fresh, never cached)
//!     → ChainState (types.rs)
//!     → builder
//!
//! engine.sign
//!     → ChainStateReader::is_current(address, unsigned)
//!     → StaleTransaction when the chain moved on
//! ```
//!
//! # Design Decisions
//! - One reader per chain, injected into the engine
//! - UTXO listings tolerate partial failure: unresolved outputs are dropped

pub mod esplora;
pub mod evm;
pub mod solana;
pub mod types;

use alloy::primitives::U256;
use async_trait::async_trait;

use crate::builder::UnsignedTransaction;
use crate::chain::Chain;
use crate::error::SendResult;

pub use esplora::EsploraStateReader;
pub use evm::EvmStateReader;
pub use solana::SolanaStateReader;
pub use types::{ChainState, UnspentOutput};

/// Reads the chain facts a send depends on.
#[async_trait]
pub trait ChainStateReader: Send + Sync {
    fn chain(&self) -> Chain;

    /// Everything the builder needs for `address`.
    async fn snapshot(&self, address: &str) -> SendResult<ChainState>;

    /// Balance in base units, used for validation and display.
    async fn balance(&self, address: &str) -> SendResult<U256>;

    /// Whether `unsigned` was built against state that is still current.
    async fn is_current(&self, address: &str, unsigned: &UnsignedTransaction) -> SendResult<bool>;
}
