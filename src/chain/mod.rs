//! Chain descriptors, amount units and address formats.
//!
//! # Data Flow
//! ```text
//! user input ("0.5", "bc1q...")
//!     → units.rs (decimal string → base-unit U256)
//!     → address.rs (per-family parse + locking script)
//!     → builder / signer
//! ```

pub mod address;
pub mod types;
pub mod units;

pub use address::{same_address, validate_address, UtxoAddress};
pub use types::{Chain, ChainFamily, FeeTier};
pub use units::{to_base_units, to_decimal_string, to_display_string};
