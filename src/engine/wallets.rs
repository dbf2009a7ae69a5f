//! Wallet resolution.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::config::WalletConfig;
use crate::error::{SendError, SendResult};

/// Where a wallet lives and which address it sends from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    pub chain: Chain,
    pub address: String,
}

impl From<&WalletConfig> for Wallet {
    fn from(config: &WalletConfig) -> Self {
        Self {
            id: config.id.clone(),
            chain: config.chain,
            address: config.address.clone(),
        }
    }
}

/// Resolves wallet ids for the engine.
#[async_trait]
pub trait WalletDirectory: Send + Sync {
    async fn resolve(&self, wallet_id: &str) -> SendResult<Wallet>;
}

/// Fixed set of wallets, typically from the `[[wallets]]` config section.
#[derive(Debug, Clone, Default)]
pub struct StaticWallets {
    wallets: HashMap<String, Wallet>,
}

impl StaticWallets {
    pub fn new(wallets: impl IntoIterator<Item = Wallet>) -> Self {
        Self {
            wallets: wallets.into_iter().map(|w| (w.id.clone(), w)).collect(),
        }
    }

    pub fn from_config(wallets: &[WalletConfig]) -> Self {
        Self::new(wallets.iter().map(Wallet::from))
    }

    /// All wallets, sorted by id.
    pub fn list(&self) -> Vec<Wallet> {
        let mut wallets: Vec<_> = self.wallets.values().cloned().collect();
        wallets.sort_by(|a, b| a.id.cmp(&b.id));
        wallets
    }
}

#[async_trait]
impl WalletDirectory for StaticWallets {
    async fn resolve(&self, wallet_id: &str) -> SendResult<Wallet> {
        self.wallets
            .get(wallet_id)
            .cloned()
            .ok_or_else(|| SendError::NotFound(format!("wallet '{}'", wallet_id)))
    }
}
