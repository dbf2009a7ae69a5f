//! Remote-API error definitions shared by the chain clients.

use thiserror::Error;

use crate::error::SendError;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur while talking to a remote chain API.
#[derive(Debug, Clone, Error)]
pub enum BlockchainError {
    /// Endpoint unreachable, connection reset, or every failover exhausted.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Endpoint answered and refused the request.
    #[error("rejected ({}): {message}", status.map(|s| s.to_string()).unwrap_or_else(|| "rpc".to_string()))]
    Rejected { status: Option<u16>, message: String },

    /// Resource does not exist (HTTP 404 or null result).
    #[error("not found: {0}")]
    NotFound(String),

    /// Response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

impl BlockchainError {
    /// True when another attempt against the same endpoint may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BlockchainError::Rpc(_) | BlockchainError::Timeout(_) | BlockchainError::NotFound(_) => true,
            BlockchainError::Rejected { status, .. } => {
                matches!(status, Some(s) if *s >= 500 || *s == 408 || *s == 429)
            }
            BlockchainError::Decode(_) | BlockchainError::ChainMismatch { .. } => false,
        }
    }

    pub(crate) fn from_reqwest(error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            BlockchainError::Timeout(timeout_secs)
        } else if error.is_decode() {
            BlockchainError::Decode(error.to_string())
        } else {
            BlockchainError::Rpc(error.to_string())
        }
    }
}

impl From<BlockchainError> for SendError {
    fn from(error: BlockchainError) -> Self {
        SendError::ChainStateUnavailable(error.to_string())
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;
