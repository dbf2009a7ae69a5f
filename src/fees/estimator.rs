//! Per-chain fee estimator.
//!
//! # Responsibilities
//! - Turn per-tier unit prices into concrete total fees
//! - Fall back to a static table when the remote source fails
//! - Fill tiers a source omitted from the nearest known tier
//! - Keep totals monotone across tiers
//!
//! # Design Decisions
//! - Estimation never fails; an outage degrades to the fallback table
//! - Unit prices are integers in base units from the moment they enter

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::primitives::U256;

use crate::chain::{to_decimal_string, Chain, FeeTier};
use crate::config::{BitcoinConfig, EvmChainConfig, SolanaConfig, TierValues};
use crate::fees::sources::{target_for, FeeSource};
use crate::fees::types::{FeeEstimate, TierPrices};
use crate::observability::metrics;

const WEI_PER_GWEI: u64 = 1_000_000_000;
const BITCOIN_BLOCK_SECONDS: u64 = 600;

/// How a unit price becomes a total fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeModel {
    /// Millisat per byte times an assumed transaction size, floored to satoshi.
    PerByte {
        size_bytes: u64,
        targets: TierValues,
    },
    /// Wei per gas times a fixed gas limit.
    Gas { gas_limit: u64 },
    /// Network-fixed fee per signature, same for every tier.
    PerSignature {
        lamports_per_signature: u64,
        signatures: u64,
    },
}

/// Fee estimator for one chain.
#[derive(Clone)]
pub struct FeeEstimator {
    chain: Chain,
    model: FeeModel,
    source: Option<Arc<dyn FeeSource>>,
    fallback: TierPrices,
}

fn tier_prices(values: &TierValues, scale: U256) -> TierPrices {
    [
        (FeeTier::Slow, values.slow),
        (FeeTier::Normal, values.normal),
        (FeeTier::Fast, values.fast),
    ]
    .into_iter()
    .map(|(tier, v)| (tier, U256::from(v) * scale))
    .collect()
}

/// Completes `prices` so every tier has a value, without interpolating, then
/// makes the sequence non-decreasing from slow to fast.
pub fn resolve_tiers(prices: &TierPrices) -> Option<TierPrices> {
    let available: Vec<FeeTier> = prices.keys().copied().collect();
    let mut resolved = TierPrices::new();
    let mut floor = U256::ZERO;
    for tier in FeeTier::ALL {
        let source_tier = tier.nearest(&available)?;
        let price = prices[&source_tier].max(floor);
        floor = price;
        resolved.insert(tier, price);
    }
    Some(resolved)
}

impl FeeEstimator {
    pub fn new(chain: Chain, model: FeeModel, source: Option<Arc<dyn FeeSource>>, fallback: TierPrices) -> Self {
        Self {
            chain,
            model,
            source,
            fallback,
        }
    }

    /// UTXO chain: indexer fee table, per-byte fallback in sat/byte.
    pub fn bitcoin(config: &BitcoinConfig, source: Option<Arc<dyn FeeSource>>) -> Self {
        Self::new(
            config.chain,
            FeeModel::PerByte {
                size_bytes: config.avg_tx_size_bytes,
                targets: config.confirmation_targets,
            },
            source,
            tier_prices(&config.fallback_sat_per_byte, U256::from(1000u64)),
        )
    }

    /// EVM chain: gas oracle or node gas price, fallback in gwei.
    pub fn evm(config: &EvmChainConfig, source: Option<Arc<dyn FeeSource>>) -> Self {
        Self::new(
            config.chain,
            FeeModel::Gas {
                gas_limit: config.gas_limit,
            },
            source,
            tier_prices(&config.fallback_gwei, U256::from(WEI_PER_GWEI)),
        )
    }

    /// Instruction chain: fixed per-signature fee.
    pub fn solana(config: &SolanaConfig) -> Self {
        let fixed = U256::from(config.lamports_per_signature);
        Self::new(
            Chain::Solana,
            FeeModel::PerSignature {
                lamports_per_signature: config.lamports_per_signature,
                signatures: 1,
            },
            None,
            FeeTier::ALL.into_iter().map(|tier| (tier, fixed)).collect(),
        )
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn model(&self) -> &FeeModel {
        &self.model
    }

    /// Estimate for a single tier.
    pub async fn estimate(&self, tier: FeeTier) -> FeeEstimate {
        let mut all = self.estimate_all().await;
        let index = all.iter().position(|e| e.tier == tier).unwrap_or(0);
        all.swap_remove(index)
    }

    /// Estimates for every tier, slow to fast.
    pub async fn estimate_all(&self) -> Vec<FeeEstimate> {
        let (prices, source) = self.unit_prices().await;
        FeeTier::ALL
            .into_iter()
            .map(|tier| {
                let price = prices.get(&tier).copied().unwrap_or(U256::ZERO);
                self.build_estimate(tier, price, source)
            })
            .collect()
    }

    async fn unit_prices(&self) -> (TierPrices, &'static str) {
        let Some(source) = &self.source else {
            let label = if matches!(self.model, FeeModel::PerSignature { .. }) {
                "fixed"
            } else {
                "fallback"
            };
            return (self.fallback_prices(), label);
        };

        match source.unit_prices().await {
            Ok(prices) => match resolve_tiers(&prices) {
                Some(resolved) => return (resolved, "remote"),
                None => {
                    tracing::warn!(chain = %self.chain, source = source.name(), "Fee source returned no tiers, using fallback");
                }
            },
            Err(e) => {
                tracing::warn!(chain = %self.chain, source = source.name(), error = %e, "Fee source unavailable, using fallback");
            }
        }
        metrics::record_fee_fallback(self.chain);
        (self.fallback_prices(), "fallback")
    }

    fn fallback_prices(&self) -> TierPrices {
        resolve_tiers(&self.fallback).unwrap_or_default()
    }

    fn build_estimate(&self, tier: FeeTier, unit_price: U256, source: &'static str) -> FeeEstimate {
        let mut aux = BTreeMap::new();
        aux.insert("source".to_string(), source.to_string());

        let (total_fee, per_unit_rate, confirm_seconds) = match &self.model {
            FeeModel::PerByte { size_bytes, targets } => {
                let target = target_for(targets, tier);
                aux.insert("target_blocks".to_string(), target.to_string());
                aux.insert("size_bytes".to_string(), size_bytes.to_string());
                let total = unit_price * U256::from(*size_bytes) / U256::from(1000u64);
                (
                    total,
                    Some(to_decimal_string(unit_price, 3)),
                    u64::from(target) * BITCOIN_BLOCK_SECONDS,
                )
            }
            FeeModel::Gas { gas_limit } => {
                aux.insert("gas_limit".to_string(), gas_limit.to_string());
                let seconds = match tier {
                    FeeTier::Slow => 180,
                    FeeTier::Normal => 60,
                    FeeTier::Fast => 15,
                };
                (
                    unit_price * U256::from(*gas_limit),
                    Some(to_decimal_string(unit_price, 9)),
                    seconds,
                )
            }
            FeeModel::PerSignature {
                lamports_per_signature,
                signatures,
            } => {
                aux.insert("signatures".to_string(), signatures.to_string());
                (
                    U256::from(*lamports_per_signature) * U256::from(*signatures),
                    None,
                    1,
                )
            }
        };

        FeeEstimate {
            tier,
            per_unit_rate,
            total_fee,
            total_fee_decimal: to_decimal_string(total_fee, self.chain.decimals()),
            estimated_confirm_seconds: confirm_seconds,
            aux_metadata: aux,
            unit_price: match self.model {
                FeeModel::PerSignature { .. } => None,
                _ => Some(unit_price),
            },
        }
    }
}

impl std::fmt::Debug for FeeEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeeEstimator")
            .field("chain", &self.chain)
            .field("model", &self.model)
            .field("source", &self.source.as_ref().map(|s| s.name()))
            .finish()
    }
}
