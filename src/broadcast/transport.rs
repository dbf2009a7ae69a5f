//! Per-chain submission endpoints.

use std::str::FromStr;

use alloy::primitives::{Bytes, TxHash};
use async_trait::async_trait;

use crate::blockchain::{BlockchainError, EsploraClient, EvmClient, SolanaRpcClient};
use crate::broadcast::classify::TransportResponse;
use crate::chain::Chain;
use crate::error::{SendError, SendResult};

/// Submits signed bytes and looks transactions up after the fact.
#[async_trait]
pub trait BroadcastTransport: Send + Sync {
    fn chain(&self) -> Chain;

    /// One submission. Never retries internally.
    async fn send_raw(&self, raw: &[u8]) -> TransportResponse;

    /// Whether the network knows `hash` as a live or landed transaction.
    async fn lookup(&self, hash: &str) -> SendResult<bool>;
}

impl From<BlockchainError> for TransportResponse {
    fn from(error: BlockchainError) -> Self {
        match error {
            BlockchainError::Rejected { status, message } => TransportResponse::Rejected { status, message },
            BlockchainError::ChainMismatch { .. } => TransportResponse::Rejected {
                status: None,
                message: error.to_string(),
            },
            // The endpoint may or may not have taken the bytes; only a lookup can tell.
            other => TransportResponse::Network(other.to_string()),
        }
    }
}

/// Esplora `POST /tx`.
pub struct EsploraTransport {
    chain: Chain,
    client: EsploraClient,
}

impl EsploraTransport {
    pub fn new(chain: Chain, client: EsploraClient) -> Self {
        Self { chain, client }
    }
}

#[async_trait]
impl BroadcastTransport for EsploraTransport {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn send_raw(&self, raw: &[u8]) -> TransportResponse {
        match self.client.broadcast(&hex::encode(raw)).await {
            Ok(txid) => TransportResponse::Accepted(txid),
            Err(e) => e.into(),
        }
    }

    async fn lookup(&self, hash: &str) -> SendResult<bool> {
        Ok(self.client.tx_status(hash).await?.is_some())
    }
}

/// `eth_sendRawTransaction` through the failover client.
pub struct EvmTransport {
    client: EvmClient,
}

impl EvmTransport {
    pub fn new(client: EvmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BroadcastTransport for EvmTransport {
    fn chain(&self) -> Chain {
        self.client.config().chain
    }

    async fn send_raw(&self, raw: &[u8]) -> TransportResponse {
        match self.client.send_raw_transaction(&Bytes::copy_from_slice(raw)).await {
            Ok(hash) => TransportResponse::Accepted(format!("{:#x}", hash)),
            Err(e) => e.into(),
        }
    }

    async fn lookup(&self, hash: &str) -> SendResult<bool> {
        let hash = TxHash::from_str(hash)
            .map_err(|e| SendError::Broadcast {
                message: format!("invalid transaction hash '{}': {}", hash, e),
                definitive: true,
            })?;
        Ok(self.client.transaction_exists(hash).await?)
    }
}

/// Solana `sendTransaction`.
pub struct SolanaTransport {
    client: SolanaRpcClient,
}

impl SolanaTransport {
    pub fn new(client: SolanaRpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BroadcastTransport for SolanaTransport {
    fn chain(&self) -> Chain {
        Chain::Solana
    }

    async fn send_raw(&self, raw: &[u8]) -> TransportResponse {
        match self.client.send_transaction(raw).await {
            Ok(signature) => TransportResponse::Accepted(signature),
            Err(e) => e.into(),
        }
    }

    /// Landed transactions that failed on chain do not count.
    async fn lookup(&self, hash: &str) -> SendResult<bool> {
        Ok(self
            .client
            .get_signature_status(hash)
            .await?
            .is_some_and(|status| status.err.is_none()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BitcoinConfig, SolanaConfig};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn esplora(server: &MockServer) -> EsploraTransport {
        let client = EsploraClient::new(&BitcoinConfig {
            enabled: true,
            esplora_url: server.uri(),
            ..BitcoinConfig::default()
        })
        .unwrap();
        EsploraTransport::new(Chain::Bitcoin, client)
    }

    #[test]
    fn test_blockchain_errors_map_to_responses() {
        let rejected: TransportResponse = BlockchainError::Rejected {
            status: Some(400),
            message: "bad-txns".into(),
        }
        .into();
        assert_eq!(
            rejected,
            TransportResponse::Rejected {
                status: Some(400),
                message: "bad-txns".into()
            }
        );
        assert!(matches!(
            TransportResponse::from(BlockchainError::Timeout(5)),
            TransportResponse::Network(_)
        ));
    }

    #[tokio::test]
    async fn test_esplora_rejection_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tx"))
            .respond_with(ResponseTemplate::new(400).set_body_string("sendrawtransaction RPC error: bad-txns-inputs-missingorspent"))
            .mount(&server)
            .await;

        match esplora(&server).send_raw(&[1, 2, 3]).await {
            TransportResponse::Rejected { status, message } => {
                assert_eq!(status, Some(400));
                assert!(message.contains("missingorspent"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_esplora_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tx/aa/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"confirmed": false})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tx/bb/status"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Transaction not found"))
            .mount(&server)
            .await;

        let transport = esplora(&server);
        assert!(transport.lookup("aa").await.unwrap());
        assert!(!transport.lookup("bb").await.unwrap());
    }

    #[tokio::test]
    async fn test_solana_failed_transaction_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "getSignatureStatuses"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "result": {"context": {"slot": 9}, "value": [{"confirmationStatus": "finalized", "err": {"InstructionError": [0, "Custom"]}}]}
            })))
            .mount(&server)
            .await;

        let client = SolanaRpcClient::new(&SolanaConfig {
            enabled: true,
            rpc_url: server.uri(),
            ..SolanaConfig::default()
        })
        .unwrap();
        assert!(!SolanaTransport::new(client).lookup("sig").await.unwrap());
    }
}
