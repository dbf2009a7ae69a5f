//! Error taxonomy shared by every stage of a send.
//!
//! Every failure surfaced to the application layer carries an [`ErrorKind`]
//! plus the underlying provider message.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::Chain;

/// Errors produced while building, signing, broadcasting or persisting a send.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// Negative, non-numeric, too precise, zero or overflowing amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Address does not parse for the target chain.
    #[error("invalid {chain} address '{address}': {reason}")]
    InvalidAddress {
        chain: Chain,
        address: String,
        reason: String,
    },

    /// Spendable value does not cover amount plus fee.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: U256, available: U256 },

    /// A remote read failed and no safe fallback exists.
    #[error("chain state unavailable: {0}")]
    ChainStateUnavailable(String),

    /// The signing oracle returned key material for a different address.
    #[error("key mismatch: record expects {expected}, key derives {derived}")]
    KeyMismatch { expected: String, derived: String },

    /// The signing oracle could not produce key material.
    #[error("key material unavailable: {0}")]
    Key(String),

    /// Key material or transaction could not be turned into a signature.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Chain state moved on since the unsigned transaction was built.
    #[error("stale transaction: {0}")]
    StaleTransaction(String),

    /// The network rejected the transaction's nonce or chain reference.
    #[error("nonce too low: {0}")]
    NonceTooLow(String),

    /// Remote endpoint kept rate limiting after all attempts.
    #[error("rate limited after {attempts} attempts: {message}")]
    RateLimited { attempts: u32, message: String },

    /// Broadcast rejected or failed; carries the provider message.
    ///
    /// `definitive` is true when the network refused the payload itself, and
    /// false when attempts ran out without a verdict.
    #[error("broadcast failed: {message}")]
    Broadcast { message: String, definitive: bool },

    /// No record or wallet with the given id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Lifecycle guard refused a state change.
    #[error("transaction {id}: cannot move from {from} to {to}")]
    InvalidTransition { id: String, from: String, to: String },

    /// Engine has no services configured for the chain.
    #[error("chain {0} is not configured")]
    UnsupportedChain(Chain),

    /// Persistence collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Machine-readable classification of a [`SendError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidAmount,
    InvalidAddress,
    InsufficientFunds,
    ChainStateUnavailable,
    KeyMismatch,
    KeyUnavailable,
    Signing,
    StaleTransaction,
    NonceTooLow,
    RateLimited,
    Broadcast,
    NotFound,
    InvalidTransition,
    UnsupportedChain,
    Storage,
}

impl SendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SendError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            SendError::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            SendError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            SendError::ChainStateUnavailable(_) => ErrorKind::ChainStateUnavailable,
            SendError::KeyMismatch { .. } => ErrorKind::KeyMismatch,
            SendError::Key(_) => ErrorKind::KeyUnavailable,
            SendError::Signing(_) => ErrorKind::Signing,
            SendError::StaleTransaction(_) => ErrorKind::StaleTransaction,
            SendError::NonceTooLow(_) => ErrorKind::NonceTooLow,
            SendError::RateLimited { .. } => ErrorKind::RateLimited,
            SendError::Broadcast { .. } => ErrorKind::Broadcast,
            SendError::NotFound(_) => ErrorKind::NotFound,
            SendError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            SendError::UnsupportedChain(_) => ErrorKind::UnsupportedChain,
            SendError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether a local retry loop may try the same operation again.
    ///
    /// Money-affecting failures are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SendError::ChainStateUnavailable(_) | SendError::RateLimited { .. }
        )
    }

    pub(crate) fn invalid_address(
        chain: Chain,
        address: &str,
        reason: impl Into<String>,
    ) -> Self {
        SendError::InvalidAddress {
            chain,
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for send operations.
pub type SendResult<T> = Result<T, SendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_provider_message() {
        let err = SendError::Broadcast {
            message: "bad-txns-vout-negative".to_string(),
            definitive: true,
        };
        assert_eq!(err.to_string(), "broadcast failed: bad-txns-vout-negative");
        assert_eq!(err.kind(), ErrorKind::Broadcast);
    }

    #[test]
    fn test_money_affecting_errors_are_not_retryable() {
        let errors = [
            SendError::InsufficientFunds {
                required: U256::from(7000),
                available: U256::from(10),
            },
            SendError::KeyMismatch {
                expected: "a".into(),
                derived: "b".into(),
            },
            SendError::NonceTooLow("nonce too low".into()),
        ];
        for err in errors {
            assert!(!err.is_retryable(), "{err} must not be retried");
        }
        assert!(SendError::ChainStateUnavailable("503".into()).is_retryable());
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::KeyMismatch).unwrap();
        assert_eq!(json, "\"KEY_MISMATCH\"");
    }
}
