//! Signer subsystem.
//!
//! # Data Flow
//! ```text
//! record.wallet_id
//!     → SigningOracle::key_material (oracle.rs)
//!     → derive_address(chain, key) == record.from_address ?  (KeyMismatch otherwise)
//!     → sign_transaction(chain, key, unsigned)
//!         ├── bitcoin.rs (legacy SIGHASH_ALL, DER + hashtype script-sigs)
//!         ├── evm.rs     (EIP-155 legacy envelope via alloy)
//!         └── solana.rs  (Ed25519 over the legacy message)
//!     → SignedTransaction { raw, hash }
//! ```
//!
//! # Security Constraints
//! - Never log key material or signed bytes
//! - Signing is pure: no network I/O after the oracle call

pub mod bitcoin;
pub mod evm;
pub mod oracle;
pub mod solana;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::builder::UnsignedTransaction;
use crate::chain::{same_address, Chain, ChainFamily};
use crate::error::{SendError, SendResult};
use crate::lifecycle::SendTransactionRecord;

pub use oracle::{EnvKeyOracle, KeyHandle, SigningOracle};

/// Signed bytes ready for broadcast, with the locally computed hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub chain: Chain,
    /// Wire bytes, hex.
    pub raw_hex: String,
    /// Txid (UTXO), `0x` keccak hash (EVM) or Base58 signature (Solana).
    pub hash: String,
}

impl SignedTransaction {
    pub fn raw_bytes(&self) -> SendResult<Vec<u8>> {
        hex::decode(&self.raw_hex).map_err(|e| SendError::Signing(format!("stored bytes are not hex: {}", e)))
    }
}

/// Address `key` controls on `chain`.
pub fn derive_address(chain: Chain, key: &KeyHandle) -> SendResult<String> {
    match chain.family() {
        ChainFamily::Utxo => bitcoin::derive_address(chain, key),
        ChainFamily::Account => evm::derive_address(key),
        ChainFamily::Instruction => solana::derive_address(key),
    }
}

/// Signs `unsigned` with `key`. Pure function of its inputs.
pub fn sign_transaction(chain: Chain, key: &KeyHandle, unsigned: &UnsignedTransaction) -> SendResult<SignedTransaction> {
    if unsigned.family() != chain.family() {
        return Err(SendError::Signing(format!(
            "{:?} transaction cannot be signed for {}",
            unsigned.family(),
            chain
        )));
    }

    let (raw, hash) = match unsigned {
        UnsignedTransaction::Utxo { inputs, outputs, .. } => {
            let signed = bitcoin::sign(chain, key, inputs, outputs)?;
            (signed.raw, signed.txid)
        }
        UnsignedTransaction::Account {
            chain_id,
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            data,
        } => {
            let signed = evm::sign(
                key,
                evm::AccountTransfer {
                    chain_id: *chain_id,
                    nonce: *nonce,
                    gas_price: *gas_price,
                    gas_limit: *gas_limit,
                    to: *to,
                    value: *value,
                    data,
                },
            )?;
            (signed.raw, format!("{:#x}", signed.hash))
        }
        UnsignedTransaction::Instruction {
            blockhash,
            fee_payer,
            instructions,
        } => {
            let signed = solana::sign(key, fee_payer, blockhash, instructions)?;
            (signed.raw, signed.signature)
        }
    };

    Ok(SignedTransaction {
        chain,
        raw_hex: hex::encode(raw),
        hash,
    })
}

/// Fetches keys from the oracle and signs on behalf of a record.
#[derive(Clone)]
pub struct Signer {
    oracle: Arc<dyn SigningOracle>,
}

impl Signer {
    pub fn new(oracle: Arc<dyn SigningOracle>) -> Self {
        Self { oracle }
    }

    /// Signs `unsigned` for `record`, refusing keys that control a different
    /// address than the record's source.
    pub async fn sign(&self, record: &SendTransactionRecord, unsigned: &UnsignedTransaction) -> SendResult<SignedTransaction> {
        let key = self.oracle.key_material(&record.wallet_id).await?;
        let derived = self.oracle.derive_address(&key, record.chain)?;

        if !same_address(record.chain, &derived, &record.from_address) {
            tracing::error!(
                tx_id = %record.id,
                wallet_id = %record.wallet_id,
                expected = %record.from_address,
                derived = %derived,
                "Signing key does not control the source address"
            );
            return Err(SendError::KeyMismatch {
                expected: record.from_address.clone(),
                derived,
            });
        }

        sign_transaction(record.chain, &key, unsigned)
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_mismatch_is_refused() {
        let key = KeyHandle::from_bytes(vec![1u8; 32]).unwrap();
        let unsigned = UnsignedTransaction::Instruction {
            blockhash: "11111111111111111111111111111111".to_string(),
            fee_payer: "11111111111111111111111111111111".to_string(),
            instructions: vec![],
        };
        assert!(matches!(
            sign_transaction(Chain::Ethereum, &key, &unsigned),
            Err(SendError::Signing(_))
        ));
    }

    #[test]
    fn test_derive_address_dispatch() {
        let key = KeyHandle::from_hex("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80").unwrap();
        assert_eq!(
            derive_address(Chain::Polygon, &key).unwrap(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert!(derive_address(Chain::BitcoinTestnet, &key).unwrap().starts_with(['m', 'n']));
        assert_eq!(bs58::decode(derive_address(Chain::Solana, &key).unwrap()).into_vec().unwrap().len(), 32);
    }
}
