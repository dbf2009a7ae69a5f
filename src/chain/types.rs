//! Chain identifiers, families and fee tiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chains the engine can send on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chain {
    Bitcoin,
    BitcoinTestnet,
    Ethereum,
    Polygon,
    #[serde(rename = "bsc")]
    BinanceSmartChain,
    Solana,
}

/// Structural family of a chain; decides which builder, signer and reader apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    /// Unspent-output accounting (satoshi).
    Utxo,
    /// Account/nonce accounting, EVM-compatible (wei).
    Account,
    /// Instruction-based messages with a recent blockhash (lamport).
    Instruction,
}

impl Chain {
    pub const ALL: [Chain; 6] = [
        Chain::Bitcoin,
        Chain::BitcoinTestnet,
        Chain::Ethereum,
        Chain::Polygon,
        Chain::BinanceSmartChain,
        Chain::Solana,
    ];

    pub fn family(self) -> ChainFamily {
        match self {
            Chain::Bitcoin | Chain::BitcoinTestnet => ChainFamily::Utxo,
            Chain::Ethereum | Chain::Polygon | Chain::BinanceSmartChain => ChainFamily::Account,
            Chain::Solana => ChainFamily::Instruction,
        }
    }

    /// Number of decimal places between the display unit and the base unit.
    pub fn decimals(self) -> u32 {
        match self.family() {
            ChainFamily::Utxo => 8,
            ChainFamily::Account => 18,
            ChainFamily::Instruction => 9,
        }
    }

    pub fn ticker(self) -> &'static str {
        match self {
            Chain::Bitcoin => "BTC",
            Chain::BitcoinTestnet => "tBTC",
            Chain::Ethereum => "ETH",
            Chain::Polygon => "POL",
            Chain::BinanceSmartChain => "BNB",
            Chain::Solana => "SOL",
        }
    }

    /// Stable lowercase name, also used as a metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            Chain::Bitcoin => "bitcoin",
            Chain::BitcoinTestnet => "bitcoin_testnet",
            Chain::Ethereum => "ethereum",
            Chain::Polygon => "polygon",
            Chain::BinanceSmartChain => "bsc",
            Chain::Solana => "solana",
        }
    }

    /// Default EIP-155 chain id for account chains.
    pub fn default_chain_id(self) -> Option<u64> {
        match self {
            Chain::Ethereum => Some(1),
            Chain::Polygon => Some(137),
            Chain::BinanceSmartChain => Some(56),
            _ => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chain::ALL
            .into_iter()
            .find(|chain| chain.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown chain '{}'", s))
    }
}

/// Coarse priority mapped to a concrete fee by the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeTier {
    Slow,
    Normal,
    Fast,
}

impl FeeTier {
    pub const ALL: [FeeTier; 3] = [FeeTier::Slow, FeeTier::Normal, FeeTier::Fast];

    /// Position in slow-to-fast order.
    pub fn rank(self) -> usize {
        match self {
            FeeTier::Slow => 0,
            FeeTier::Normal => 1,
            FeeTier::Fast => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeeTier::Slow => "slow",
            FeeTier::Normal => "normal",
            FeeTier::Fast => "fast",
        }
    }

    /// Picks the available tier closest to `self`; equal distance prefers the faster one.
    pub fn nearest(self, available: &[FeeTier]) -> Option<FeeTier> {
        available.iter().copied().min_by_key(|candidate| {
            let distance = candidate.rank().abs_diff(self.rank());
            // Faster tiers sort first on ties.
            (distance, 2 - candidate.rank())
        })
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeeTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeeTier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown fee tier '{}'", s))
    }
}
