//! Signing oracle seam and key handles.
//!
//! # Security
//! - Key bytes live in a zeroizing buffer and are never logged
//! - The engine never generates or persists keys; it only asks the oracle

use std::fmt;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::chain::Chain;
use crate::error::{SendError, SendResult};
use crate::signer::derive_address;

/// Environment variable prefix for the environment-backed oracle.
pub const KEY_ENV_PREFIX: &str = "SEND_ENGINE_KEY_";

/// Raw private key material returned by an oracle.
///
/// 32-byte secrets work for every chain; Solana also accepts a 64-byte
/// keypair (secret followed by public key).
pub struct KeyHandle {
    secret: Zeroizing<Vec<u8>>,
}

impl KeyHandle {
    pub fn from_bytes(bytes: Vec<u8>) -> SendResult<Self> {
        let secret = Zeroizing::new(bytes);
        if secret.len() != 32 && secret.len() != 64 {
            return Err(SendError::Key(format!(
                "expected 32 or 64 key bytes, got {}",
                secret.len()
            )));
        }
        Ok(Self { secret })
    }

    /// Parse hex, with or without a `0x` prefix.
    pub fn from_hex(value: &str) -> SendResult<Self> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits)
            .map_err(|e| SendError::Key(format!("Invalid private key format: {}", e)))?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.secret
    }

    /// The 32-byte secret scalar or seed.
    pub fn secret(&self) -> SendResult<[u8; 32]> {
        let mut out = [0u8; 32];
        let bytes = self.secret.get(..32).ok_or_else(|| SendError::Key("key too short".to_string()))?;
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Public half of a 64-byte keypair, if present.
    pub fn embedded_public(&self) -> Option<&[u8]> {
        self.secret.get(32..64)
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyHandle")
            .field("len", &self.secret.len())
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// External capability holding key material per wallet.
#[async_trait]
pub trait SigningOracle: Send + Sync {
    async fn key_material(&self, wallet_id: &str) -> SendResult<KeyHandle>;

    /// Address the key controls on `chain`.
    fn derive_address(&self, key: &KeyHandle, chain: Chain) -> SendResult<String> {
        derive_address(chain, key)
    }
}

/// Reads hex keys from `SEND_ENGINE_KEY_<WALLET_ID>`.
#[derive(Debug, Clone, Default)]
pub struct EnvKeyOracle;

impl EnvKeyOracle {
    /// Variable name for `wallet_id`: upper-cased, non-alphanumerics as `_`.
    pub fn variable_for(wallet_id: &str) -> String {
        let suffix: String = wallet_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}{}", KEY_ENV_PREFIX, suffix)
    }
}

#[async_trait]
impl SigningOracle for EnvKeyOracle {
    async fn key_material(&self, wallet_id: &str) -> SendResult<KeyHandle> {
        let variable = Self::variable_for(wallet_id);
        let value = std::env::var(&variable)
            .map_err(|_| SendError::Key(format!("Environment variable {} not set", variable)))?;
        KeyHandle::from_hex(&value)
    }
}
