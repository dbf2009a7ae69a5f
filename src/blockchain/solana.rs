//! Solana JSON-RPC client.
//!
//! # Responsibilities
//! - Fetch the latest blockhash and check whether a blockhash is still valid
//! - Read lamport balances
//! - Submit base64-encoded transactions via `sendTransaction`
//! - Look up signature status for reconciliation

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::SolanaConfig;

/// JSON-RPC envelope.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Responses wrapped in `{context, value}`.
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    blockhash: String,
}

/// Status entry from `getSignatureStatuses`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    #[serde(default)]
    pub confirmation_status: Option<String>,
    /// Execution error, `None` when the transaction succeeded.
    #[serde(default)]
    pub err: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct SolanaRpcClient {
    http: reqwest::Client,
    rpc_url: String,
    timeout_secs: u64,
}

impl SolanaRpcClient {
    pub fn new(config: &SolanaConfig) -> BlockchainResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BlockchainError::Rpc(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            rpc_url: config.rpc_url.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> BlockchainResult<T> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, "Solana RPC request");

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| BlockchainError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BlockchainError::Rejected {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let parsed: JsonRpcResponse<T> = response
            .json()
            .await
            .map_err(|e| BlockchainError::Decode(format!("{}: {}", method, e)))?;

        if let Some(error) = parsed.error {
            return Err(BlockchainError::Rejected {
                status: None,
                message: format!("rpc error {}: {}", error.code, error.message),
            });
        }
        parsed
            .result
            .ok_or_else(|| BlockchainError::Decode(format!("{}: rpc returned neither result nor error", method)))
    }

    pub async fn get_latest_blockhash(&self) -> BlockchainResult<String> {
        let response: WithContext<LatestBlockhash> = self
            .call("getLatestBlockhash", json!([{"commitment": "finalized"}]))
            .await?;
        Ok(response.value.blockhash)
    }

    pub async fn is_blockhash_valid(&self, blockhash: &str) -> BlockchainResult<bool> {
        let response: WithContext<bool> = self
            .call("isBlockhashValid", json!([blockhash, {"commitment": "processed"}]))
            .await?;
        Ok(response.value)
    }

    /// Balance in lamports.
    pub async fn get_balance(&self, address: &str) -> BlockchainResult<u64> {
        let response: WithContext<u64> = self.call("getBalance", json!([address])).await?;
        Ok(response.value)
    }

    /// Submit a wire-format transaction; returns the signature the node reports.
    pub async fn send_transaction(&self, wire: &[u8]) -> BlockchainResult<String> {
        let encoded = BASE64_STANDARD.encode(wire);
        self.call(
            "sendTransaction",
            json!([encoded, {"encoding": "base64", "preflightCommitment": "confirmed"}]),
        )
        .await
    }

    /// Status for `signature`, `None` when unknown to the node.
    pub async fn get_signature_status(&self, signature: &str) -> BlockchainResult<Option<SignatureStatus>> {
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature], {"searchTransactionHistory": true}]),
            )
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SolanaRpcClient {
        SolanaRpcClient::new(&SolanaConfig {
            enabled: true,
            rpc_url: server.uri(),
            ..SolanaConfig::default()
        })
        .unwrap()
    }

    async fn mock_result(server: &MockServer, rpc_method: &str, result: Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": rpc_method})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": result
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_latest_blockhash_and_balance() {
        let server = MockServer::start().await;
        mock_result(
            &server,
            "getLatestBlockhash",
            json!({"context": {"slot": 1}, "value": {"blockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N", "lastValidBlockHeight": 200}}),
        )
        .await;
        mock_result(&server, "getBalance", json!({"context": {"slot": 1}, "value": 1_500_000_000u64})).await;

        let client = client(&server);
        assert_eq!(
            client.get_latest_blockhash().await.unwrap(),
            "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N"
        );
        assert_eq!(client.get_balance("any").await.unwrap(), 1_500_000_000);
    }

    #[tokio::test]
    async fn test_rpc_error_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": -32002, "message": "Transaction simulation failed: Blockhash not found"}
            })))
            .mount(&server)
            .await;

        match client(&server).send_transaction(&[1, 2, 3]).await {
            Err(BlockchainError::Rejected { status: None, message }) => {
                assert!(message.contains("Blockhash not found"));
                assert!(message.contains("-32002"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_signature_status_lookup() {
        let server = MockServer::start().await;
        mock_result(
            &server,
            "getSignatureStatuses",
            json!({"context": {"slot": 5}, "value": [{"slot": 4, "confirmations": null, "err": null, "confirmationStatus": "finalized"}]}),
        )
        .await;

        let status = client(&server).get_signature_status("sig").await.unwrap().unwrap();
        assert_eq!(status.confirmation_status.as_deref(), Some("finalized"));
        assert!(status.err.is_none());
    }

    #[tokio::test]
    async fn test_unknown_signature_is_none() {
        let server = MockServer::start().await;
        mock_result(&server, "getSignatureStatuses", json!({"context": {"slot": 5}, "value": [null]})).await;
        assert!(client(&server).get_signature_status("sig").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_status_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
            .mount(&server)
            .await;

        let err = client(&server).get_balance("any").await.unwrap_err();
        assert!(matches!(err, BlockchainError::Rejected { status: Some(429), .. }));
    }
}
