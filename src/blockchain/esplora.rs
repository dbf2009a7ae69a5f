//! Esplora-style UTXO indexer client.
//!
//! # Responsibilities
//! - List an address's unspent outputs and funded/spent totals
//! - Fetch parent transactions to recover locking scripts
//! - Check outpoint spend status and transaction confirmation status
//! - Read the fee-estimate table and submit raw transactions

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::BitcoinConfig;

/// Unspent output as listed by `/address/{addr}/utxo`.
#[derive(Debug, Clone, Deserialize)]
pub struct EsploraUtxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
}

/// Output of a transaction as returned by `/tx/{txid}`.
#[derive(Debug, Clone, Deserialize)]
pub struct EsploraVout {
    /// Locking script, hex.
    pub scriptpubkey: String,
    pub value: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsploraTransaction {
    pub txid: String,
    pub vout: Vec<EsploraVout>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsploraTxStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsploraOutspend {
    pub spent: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FundingStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct AddressStats {
    chain_stats: FundingStats,
    #[serde(default)]
    mempool_stats: FundingStats,
}

/// HTTP client for an Esplora-compatible REST API.
#[derive(Debug, Clone)]
pub struct EsploraClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl EsploraClient {
    pub fn new(config: &BitcoinConfig) -> BlockchainResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BlockchainError::Rpc(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.esplora_url.trim_end_matches('/').to_string(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    async fn get_text(&self, path: &str) -> BlockchainResult<String> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Esplora request");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BlockchainError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BlockchainError::from_reqwest(e, self.timeout_secs))?;

        if status == StatusCode::NOT_FOUND {
            return Err(BlockchainError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(BlockchainError::Rejected {
                status: Some(status.as_u16()),
                message: body,
            });
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> BlockchainResult<T> {
        let body = self.get_text(path).await?;
        serde_json::from_str(&body).map_err(|e| BlockchainError::Decode(format!("{}: {}", path, e)))
    }

    /// Unspent outputs for `address`, in indexer order.
    pub async fn address_utxos(&self, address: &str) -> BlockchainResult<Vec<EsploraUtxo>> {
        self.get_json(&format!("/address/{}/utxo", address)).await
    }

    /// Confirmed plus mempool balance.
    pub async fn address_balance(&self, address: &str) -> BlockchainResult<u64> {
        let stats: AddressStats = self.get_json(&format!("/address/{}", address)).await?;
        let funded = stats.chain_stats.funded_txo_sum + stats.mempool_stats.funded_txo_sum;
        let spent = stats.chain_stats.spent_txo_sum + stats.mempool_stats.spent_txo_sum;
        Ok(funded.saturating_sub(spent))
    }

    pub async fn transaction(&self, txid: &str) -> BlockchainResult<EsploraTransaction> {
        self.get_json(&format!("/tx/{}", txid)).await
    }

    /// Confirmation status; `None` when the indexer has never seen `txid`.
    pub async fn tx_status(&self, txid: &str) -> BlockchainResult<Option<EsploraTxStatus>> {
        match self.get_json(&format!("/tx/{}/status", txid)).await {
            Ok(status) => Ok(Some(status)),
            Err(BlockchainError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn outspend(&self, txid: &str, vout: u32) -> BlockchainResult<EsploraOutspend> {
        self.get_json(&format!("/tx/{}/outspend/{}", txid, vout)).await
    }

    /// Fee rates in sat/vB keyed by confirmation target in blocks.
    pub async fn fee_estimates(&self) -> BlockchainResult<BTreeMap<u32, f64>> {
        let raw: BTreeMap<String, f64> = self.get_json("/fee-estimates").await?;
        Ok(raw
            .into_iter()
            .filter_map(|(target, rate)| target.parse().ok().map(|t| (t, rate)))
            .collect())
    }

    /// POST the raw transaction hex; returns the txid the indexer reports.
    pub async fn broadcast(&self, raw_hex: &str) -> BlockchainResult<String> {
        let url = format!("{}/tx", self.base_url);
        let response = self
            .http
            .post(&url)
            .body(raw_hex.to_string())
            .send()
            .await
            .map_err(|e| BlockchainError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BlockchainError::from_reqwest(e, self.timeout_secs))?;

        if status.is_success() {
            Ok(body.trim().to_string())
        } else {
            Err(BlockchainError::Rejected {
                status: Some(status.as_u16()),
                message: body,
            })
        }
    }
}
