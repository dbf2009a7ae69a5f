//! Fee estimate data model.

use std::collections::BTreeMap;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::chain::FeeTier;

/// Concrete fee for one tier on one chain.
///
/// `total_fee` is in base units; `per_unit_rate` is the human-readable price
/// per byte (sat/byte) or per gas (gwei) when the chain has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub tier: FeeTier,
    pub per_unit_rate: Option<String>,
    pub total_fee: U256,
    pub total_fee_decimal: String,
    pub estimated_confirm_seconds: u64,
    pub aux_metadata: BTreeMap<String, String>,
    /// Raw per-unit price in base units (millisat/byte or wei/gas).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<U256>,
}

impl FeeEstimate {
    /// Where the price came from: `remote`, `fallback` or `fixed`.
    pub fn source(&self) -> &str {
        self.aux_metadata.get("source").map(String::as_str).unwrap_or("unknown")
    }
}

/// Unit prices per tier. Remote sources may leave tiers out.
pub type TierPrices = BTreeMap<FeeTier, U256>;
