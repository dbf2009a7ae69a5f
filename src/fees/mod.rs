//! Fee estimation subsystem.
//!
//! # Data Flow
//! ```text
//! sources.rs (Esplora fee table | gas oracle | node gas price)
//!     → estimator.rs (nearest-tier fill, monotone clamp, fallback table)
//!     → FeeEstimate per tier (types.rs)
//!     → engine (create_send) / UI (estimate_fees)
//! ```

pub mod estimator;
pub mod sources;
pub mod types;

pub use estimator::{FeeEstimator, FeeModel};
pub use sources::{EsploraFeeSource, EtherscanGasOracle, FeeSource, NodeGasPrice};
pub use types::{FeeEstimate, TierPrices};
