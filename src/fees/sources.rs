//! Remote fee sources.
//!
//! Each source reports a unit price per tier in base units: millisatoshi per
//! byte for the UTXO chain, wei per gas for EVM chains. Sources may omit
//! tiers; the estimator fills the gaps.

use std::collections::BTreeMap;
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde::Deserialize;

use crate::blockchain::{BlockchainError, BlockchainResult, EsploraClient, EvmClient};
use crate::chain::{to_base_units, FeeTier};
use crate::config::TierValues;
use crate::fees::types::TierPrices;

/// A live source of per-tier unit prices.
#[async_trait]
pub trait FeeSource: Send + Sync {
    async fn unit_prices(&self) -> BlockchainResult<TierPrices>;

    /// Short label for logs and metadata.
    fn name(&self) -> &'static str;
}

/// Confirmation-target bucket for `tier`.
pub fn target_for(targets: &TierValues, tier: FeeTier) -> u32 {
    let blocks = match tier {
        FeeTier::Slow => targets.slow,
        FeeTier::Normal => targets.normal,
        FeeTier::Fast => targets.fast,
    };
    u32::try_from(blocks).unwrap_or(u32::MAX)
}

/// Available bucket closest to `wanted`; equal distance prefers the smaller
/// (faster) target. Never interpolates between buckets.
pub fn nearest_target(table: &BTreeMap<u32, f64>, wanted: u32) -> Option<(u32, f64)> {
    table
        .iter()
        .min_by_key(|(target, _)| (target.abs_diff(wanted), **target))
        .map(|(target, rate)| (*target, *rate))
}

/// sat/vB float from the indexer to integer millisat/byte.
fn millisat_per_byte(sat_per_vbyte: f64) -> Option<U256> {
    if !sat_per_vbyte.is_finite() || sat_per_vbyte < 0.0 {
        return None;
    }
    let millis = (sat_per_vbyte * 1000.0).ceil();
    if millis > u64::MAX as f64 {
        return None;
    }
    Some(U256::from(millis as u64))
}

/// Fee-per-byte table from an Esplora indexer, keyed by confirmation target.
pub struct EsploraFeeSource {
    client: EsploraClient,
    targets: TierValues,
}

impl EsploraFeeSource {
    pub fn new(client: EsploraClient, targets: TierValues) -> Self {
        Self { client, targets }
    }
}

#[async_trait]
impl FeeSource for EsploraFeeSource {
    async fn unit_prices(&self) -> BlockchainResult<TierPrices> {
        let table = self.client.fee_estimates().await?;
        let mut prices = TierPrices::new();
        for tier in FeeTier::ALL {
            let wanted = target_for(&self.targets, tier);
            if let Some((bucket, rate)) = nearest_target(&table, wanted) {
                if let Some(price) = millisat_per_byte(rate) {
                    tracing::debug!(tier = %tier, wanted, bucket, rate, "Resolved fee bucket");
                    prices.insert(tier, price);
                }
            }
        }
        Ok(prices)
    }

    fn name(&self) -> &'static str {
        "esplora"
    }
}

#[derive(Debug, Deserialize)]
struct GasOracleResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GasOracleResult {
    safe_gas_price: Option<String>,
    propose_gas_price: Option<String>,
    fast_gas_price: Option<String>,
}

/// Etherscan-compatible `gastracker/gasoracle` endpoint (gwei strings).
pub struct EtherscanGasOracle {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl EtherscanGasOracle {
    pub fn new(url: String, api_key: Option<String>, timeout_secs: u64) -> BlockchainResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BlockchainError::Rpc(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            url,
            api_key,
            timeout_secs,
        })
    }
}

fn gwei_to_wei(gwei: &str) -> Option<U256> {
    to_base_units(gwei.trim(), 9).ok()
}

#[async_trait]
impl FeeSource for EtherscanGasOracle {
    async fn unit_prices(&self) -> BlockchainResult<TierPrices> {
        let mut query = vec![("module", "gastracker"), ("action", "gasoracle")];
        if let Some(key) = &self.api_key {
            query.push(("apikey", key.as_str()));
        }

        let response = self
            .http
            .get(&self.url)
            .query(&query)
            .send()
            .await
            .map_err(|e| BlockchainError::from_reqwest(e, self.timeout_secs))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BlockchainError::Rejected {
                status: Some(status.as_u16()),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: GasOracleResponse = response
            .json()
            .await
            .map_err(|e| BlockchainError::Decode(format!("gas oracle: {}", e)))?;
        if body.status != "1" {
            // Etherscan reports errors with status "0" and the reason in `result`.
            return Err(BlockchainError::Rejected {
                status: None,
                message: format!("{}: {}", body.message, body.result),
            });
        }
        let result: GasOracleResult = serde_json::from_value(body.result)
            .map_err(|e| BlockchainError::Decode(format!("gas oracle result: {}", e)))?;

        let mut prices = TierPrices::new();
        let fields = [
            (FeeTier::Slow, result.safe_gas_price),
            (FeeTier::Normal, result.propose_gas_price),
            (FeeTier::Fast, result.fast_gas_price),
        ];
        for (tier, value) in fields {
            if let Some(wei) = value.as_deref().and_then(gwei_to_wei) {
                prices.insert(tier, wei);
            }
        }
        Ok(prices)
    }

    fn name(&self) -> &'static str {
        "gas_oracle"
    }
}

/// Node `eth_gasPrice` scaled to 90% / 100% / 125%.
pub struct NodeGasPrice {
    client: EvmClient,
}

impl NodeGasPrice {
    pub fn new(client: EvmClient) -> Self {
        Self { client }
    }
}

/// Percent of the node gas price used for each tier.
pub fn node_tier_percent(tier: FeeTier) -> u64 {
    match tier {
        FeeTier::Slow => 90,
        FeeTier::Normal => 100,
        FeeTier::Fast => 125,
    }
}

#[async_trait]
impl FeeSource for NodeGasPrice {
    async fn unit_prices(&self) -> BlockchainResult<TierPrices> {
        let base = U256::from(self.client.get_gas_price().await?);
        Ok(FeeTier::ALL
            .into_iter()
            .map(|tier| (tier, base * U256::from(node_tier_percent(tier)) / U256::from(100u64)))
            .collect())
    }

    fn name(&self) -> &'static str {
        "node_gas_price"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BitcoinConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_nearest_target_prefers_faster_on_tie() {
        let table: BTreeMap<u32, f64> = [(1, 40.0), (3, 20.0), (144, 1.0)].into_iter().collect();
        assert_eq!(nearest_target(&table, 2), Some((1, 40.0)));
        assert_eq!(nearest_target(&table, 6), Some((3, 20.0)));
        assert_eq!(nearest_target(&table, 1008), Some((144, 1.0)));
        assert_eq!(nearest_target(&BTreeMap::new(), 6), None);
    }

    #[test]
    fn test_millisat_conversion() {
        assert_eq!(millisat_per_byte(12.5), Some(U256::from(12_500u64)));
        assert_eq!(millisat_per_byte(1.0001), Some(U256::from(1_001u64)));
        assert_eq!(millisat_per_byte(-1.0), None);
        assert_eq!(millisat_per_byte(f64::NAN), None);
    }

    #[tokio::test]
    async fn test_esplora_source_maps_buckets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fee-estimates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "2": 20.0, "6": 10.0, "144": 2.0
            })))
            .mount(&server)
            .await;

        let config = BitcoinConfig {
            esplora_url: server.uri(),
            ..BitcoinConfig::default()
        };
        let source = EsploraFeeSource::new(EsploraClient::new(&config).unwrap(), config.confirmation_targets);
        let prices = source.unit_prices().await.unwrap();
        assert_eq!(prices[&FeeTier::Fast], U256::from(20_000u64));
        assert_eq!(prices[&FeeTier::Normal], U256::from(10_000u64));
        assert_eq!(prices[&FeeTier::Slow], U256::from(2_000u64));
    }

    #[tokio::test]
    async fn test_gas_oracle_parses_gwei_and_skips_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("module", "gastracker"))
            .and(query_param("apikey", "KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "1",
                "message": "OK",
                "result": {"SafeGasPrice": "20", "FastGasPrice": "31.5"}
            })))
            .mount(&server)
            .await;

        let oracle =
            EtherscanGasOracle::new(format!("{}/api", server.uri()), Some("KEY".to_string()), 5).unwrap();
        let prices = oracle.unit_prices().await.unwrap();
        assert_eq!(prices[&FeeTier::Slow], U256::from(20_000_000_000u64));
        assert_eq!(prices[&FeeTier::Fast], U256::from(31_500_000_000u64));
        assert!(!prices.contains_key(&FeeTier::Normal));
    }

    #[tokio::test]
    async fn test_gas_oracle_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "0",
                "message": "NOTOK",
                "result": "Max rate limit reached"
            })))
            .mount(&server)
            .await;

        let oracle = EtherscanGasOracle::new(server.uri(), None, 5).unwrap();
        let err = oracle.unit_prices().await.unwrap_err();
        assert!(err.to_string().contains("Max rate limit reached"));
    }
}
