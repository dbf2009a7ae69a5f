//! Send engine.
//!
//! # Data Flow
//! ```text
//! create_send(wallet, to, amount, tier)
//!     → WalletDirectory → FeeEstimator + ChainStateReader → builder
//!     → TransactionStore (BUILDING)
//! sign(id)
//!     → ChainStateReader::is_current → Signer → TransactionStore (SIGNED)
//! broadcast(id)
//!     → TransactionStore (BROADCASTING) → Broadcaster
//!     → TransactionStore (SUCCESS | FAILED | still BROADCASTING)
//! ```
//!
//! # Design Decisions
//! - Services are injected per chain; no global clients
//! - Each step persists before the next one starts

pub mod service;
pub mod services;
pub mod wallets;

pub use service::{Balance, SendEngine};
pub use services::{services_from_config, ChainServices};
pub use wallets::{StaticWallets, Wallet, WalletDirectory};
