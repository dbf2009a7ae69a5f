//! Account chain state via EVM JSON-RPC.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::blockchain::EvmClient;
use crate::builder::UnsignedTransaction;
use crate::chain::address::parse_account_address;
use crate::chain::Chain;
use crate::error::{SendError, SendResult};
use crate::state::types::ChainState;
use crate::state::ChainStateReader;

pub struct EvmStateReader {
    chain: Chain,
    chain_id: u64,
    client: EvmClient,
}

impl EvmStateReader {
    pub fn new(client: EvmClient) -> Self {
        Self {
            chain: client.config().chain,
            chain_id: client.config().chain_id,
            client,
        }
    }

    fn address(&self, address: &str) -> SendResult<Address> {
        parse_account_address(self.chain, address)
    }

    /// Next nonce: the count of transactions the address has sent.
    pub async fn nonce_for(&self, address: &str) -> SendResult<u64> {
        Ok(self.client.get_transaction_count(self.address(address)?).await?)
    }
}

#[async_trait]
impl ChainStateReader for EvmStateReader {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn snapshot(&self, address: &str) -> SendResult<ChainState> {
        let parsed = self.address(address)?;
        let nonce = self.client.get_transaction_count(parsed).await?;
        let balance = self.client.get_balance(parsed).await?;
        tracing::debug!(chain = %self.chain, address, nonce, "Read account state");
        Ok(ChainState::Account {
            chain_id: self.chain_id,
            nonce,
            balance,
        })
    }

    async fn balance(&self, address: &str) -> SendResult<U256> {
        Ok(self.client.get_balance(self.address(address)?).await?)
    }

    async fn is_current(&self, address: &str, unsigned: &UnsignedTransaction) -> SendResult<bool> {
        let UnsignedTransaction::Account { nonce, .. } = unsigned else {
            return Err(SendError::UnsupportedChain(self.chain));
        };
        let on_chain = self.nonce_for(address).await?;
        if on_chain != *nonce {
            tracing::info!(chain = %self.chain, built = nonce, on_chain, "Nonce moved since build");
        }
        Ok(on_chain == *nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvmChainConfig;
    use alloy::primitives::Bytes;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    /// Anvil-like node whose nonce is read from `nonce` on every call.
    async fn node(nonce: Arc<AtomicU64>) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(move |request: &Request| {
                let body: serde_json::Value = request.body_json().unwrap();
                let result = match body["method"].as_str() {
                    Some("eth_chainId") => "0x7a69".to_string(),
                    Some("eth_getTransactionCount") => format!("{:#x}", nonce.load(Ordering::SeqCst)),
                    Some("eth_getBalance") => "0xde0b6b3a7640000".to_string(),
                    _ => {
                        return ResponseTemplate::new(200).set_body_json(serde_json::json!({
                            "jsonrpc": "2.0",
                            "id": body["id"],
                            "error": {"code": -32601, "message": "method not found"},
                        }))
                    }
                };
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": body["id"],
                    "result": result,
                }))
            })
            .mount(&server)
            .await;
        server
    }

    async fn reader(server: &MockServer) -> EvmStateReader {
        let config = EvmChainConfig {
            rpc_url: server.uri(),
            chain_id: 31337,
            rpc_timeout_secs: 5,
            ..EvmChainConfig::default()
        };
        EvmStateReader::new(EvmClient::new(&config).await.unwrap())
    }

    fn unsigned(nonce: u64) -> UnsignedTransaction {
        UnsignedTransaction::Account {
            chain_id: 31337,
            nonce,
            gas_price: U256::from(1_000_000_000u64),
            gas_limit: 21_000,
            to: ADDRESS.parse().unwrap(),
            value: U256::from(1u64),
            data: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn test_nonce_is_the_sent_transaction_count() {
        let nonce = Arc::new(AtomicU64::new(7));
        let server = node(nonce.clone()).await;
        let reader = reader(&server).await;

        assert_eq!(reader.nonce_for(ADDRESS).await.unwrap(), 7);
        match reader.snapshot(ADDRESS).await.unwrap() {
            ChainState::Account { chain_id, nonce, balance } => {
                assert_eq!(chain_id, 31337);
                assert_eq!(nonce, 7);
                assert_eq!(balance, U256::from(1_000_000_000_000_000_000u64));
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_moved_nonce_makes_build_stale() {
        let nonce = Arc::new(AtomicU64::new(7));
        let server = node(nonce.clone()).await;
        let reader = reader(&server).await;

        assert!(reader.is_current(ADDRESS, &unsigned(7)).await.unwrap());
        nonce.store(8, Ordering::SeqCst);
        assert!(!reader.is_current(ADDRESS, &unsigned(7)).await.unwrap());
        assert_eq!(reader.nonce_for(ADDRESS).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_malformed_address_is_refused() {
        let server = node(Arc::new(AtomicU64::new(0))).await;
        let reader = reader(&server).await;
        assert!(matches!(
            reader.nonce_for("0x1234").await,
            Err(SendError::InvalidAddress { .. })
        ));
    }
}
