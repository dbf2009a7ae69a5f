//! Send record and status machine.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::builder::UnsignedTransaction;
use crate::chain::{Chain, FeeTier};
use crate::error::{ErrorKind, SendError};
use crate::signer::SignedTransaction;

/// Seconds since the Unix epoch.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Where a send is in its lifecycle.
///
/// `BUILDING → SIGNED → BROADCASTING → {SUCCESS | FAILED}`. A record may be
/// rebuilt while `BUILDING` and re-broadcast while `BROADCASTING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Building,
    Signed,
    Broadcasting,
    Success,
    Failed,
}

impl TxStatus {
    /// Not yet resolved by a broadcast.
    pub fn is_pending(self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Success | TxStatus::Failed)
    }

    pub fn can_transition_to(self, next: TxStatus) -> bool {
        use TxStatus::*;
        matches!(
            (self, next),
            (Building, Building)
                | (Building, Signed)
                | (Signed, Broadcasting)
                | (Broadcasting, Broadcasting)
                | (Broadcasting, Success)
                | (Broadcasting, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TxStatus::Building => "BUILDING",
            TxStatus::Signed => "SIGNED",
            TxStatus::Broadcasting => "BROADCASTING",
            TxStatus::Success => "SUCCESS",
            TxStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last failure recorded against a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&SendError> for Failure {
    fn from(error: &SendError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Persisted unit of truth for one send.
///
/// `amount` and `fee` are fixed when the record is created; the store
/// rejects any save that changes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTransactionRecord {
    pub id: String,
    pub wallet_id: String,
    pub chain: Chain,
    pub from_address: String,
    pub to_address: String,
    /// Base units.
    pub amount: U256,
    pub amount_decimal: String,
    /// Base units.
    pub fee: U256,
    pub fee_decimal: String,
    pub fee_tier: FeeTier,
    pub status: TxStatus,
    /// Transaction the current signature (if any) was made over.
    pub unsigned: UnsignedTransaction,
    pub nonce_or_blockhash: String,
    #[serde(default)]
    pub signed_hex: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub failure: Option<Failure>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl SendTransactionRecord {
    /// Signed artifact, once the record has been signed.
    pub fn signed_transaction(&self) -> Option<SignedTransaction> {
        match (&self.signed_hex, &self.hash) {
            (Some(raw_hex), Some(hash)) => Some(SignedTransaction {
                chain: self.chain,
                raw_hex: raw_hex.clone(),
                hash: hash.clone(),
            }),
            _ => None,
        }
    }

    /// Copy of the record moved to `status`.
    pub fn with_status(&self, status: TxStatus) -> Self {
        Self {
            status,
            updated_at: now_secs(),
            ..self.clone()
        }
    }

    /// Whether `other` carries the same money and identity fields.
    pub fn same_terms(&self, other: &SendTransactionRecord) -> bool {
        self.id == other.id
            && self.wallet_id == other.wallet_id
            && self.chain == other.chain
            && self.from_address == other.from_address
            && self.to_address == other.to_address
            && self.amount == other.amount
            && self.amount_decimal == other.amount_decimal
            && self.fee == other.fee
            && self.fee_decimal == other.fee_decimal
            && self.fee_tier == other.fee_tier
            && self.created_at == other.created_at
    }
}
