//! Multi-chain send engine.
//!
//! Builds, signs and broadcasts value transfers on a UTXO chain (Bitcoin via
//! an Esplora indexer), EVM account chains (JSON-RPC via alloy) and Solana.
//!
//! # Architecture Overview
//!
//! ```text
//!   create_send ──▶ engine ──▶ fees ──────────┐
//!                     │        state ─────────┤
//!                     │                       ▼
//!                     │                    builder ──▶ UnsignedTransaction
//!                     │                                      │
//!   sign ─────────▶ engine ──▶ state (is_current) ──▶ signer ◀── SigningOracle
//!                     │                                      │
//!   broadcast ────▶ engine ──▶ broadcast (classify + retry) ◀┘
//!                     │
//!                     └──▶ lifecycle (BUILDING → SIGNED → BROADCASTING → SUCCESS | FAILED)
//!
//!   Cross-cutting: chain (units, addresses) · blockchain (remote clients)
//!                  config · resilience · observability · error
//! ```

pub mod blockchain;
pub mod broadcast;
pub mod builder;
pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod fees;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod signer;
pub mod state;

pub use broadcast::{BroadcastOutcome, Disposition};
pub use chain::{Chain, FeeTier};
pub use config::EngineConfig;
pub use engine::{SendEngine, StaticWallets, WalletDirectory};
pub use error::{ErrorKind, SendError, SendResult};
pub use lifecycle::{SendTransactionRecord, TransactionStore, TxStatus};
pub use signer::{SignedTransaction, SigningOracle};
