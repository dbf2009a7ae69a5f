//! EIP-155 legacy transaction signing for EVM chains.

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::chain::units::to_u128;
use crate::error::{SendError, SendResult};
use crate::signer::KeyHandle;

fn local_signer(key: &KeyHandle) -> SendResult<PrivateKeySigner> {
    let secret = key.secret()?;
    PrivateKeySigner::from_slice(&secret)
        .map_err(|e| SendError::Key(format!("Invalid private key format: {}", e)))
}

/// EIP-55 checksummed address of the key.
pub fn derive_address(key: &KeyHandle) -> SendResult<String> {
    Ok(local_signer(key)?.address().to_checksum(None))
}

/// Fields of an account-chain transfer.
pub struct AccountTransfer<'a> {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: &'a Bytes,
}

/// Signed envelope bytes and keccak256 hash.
pub struct SignedAccount {
    pub raw: Vec<u8>,
    pub hash: B256,
}

pub fn sign(key: &KeyHandle, transfer: AccountTransfer<'_>) -> SendResult<SignedAccount> {
    let signer = local_signer(key)?;

    let tx = TxLegacy {
        chain_id: Some(transfer.chain_id),
        nonce: transfer.nonce,
        gas_price: to_u128(transfer.gas_price, "gas price")?,
        gas_limit: transfer.gas_limit,
        to: TxKind::Call(transfer.to),
        value: transfer.value,
        input: transfer.data.clone(),
    };

    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .map_err(|e| SendError::Signing(format!("Signing failed: {}", e)))?;
    let envelope = TxEnvelope::Legacy(tx.into_signed(signature));
    let raw = envelope.encoded_2718();
    let hash = keccak256(&raw);

    Ok(SignedAccount { raw, hash })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::eips::eip2718::Decodable2718;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_derive_address() {
        let key = KeyHandle::from_hex(TEST_PRIVATE_KEY).unwrap();
        assert_eq!(
            derive_address(&key).unwrap(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn test_eip155_reference_vector() {
        // Example transaction from the EIP-155 text.
        let key = KeyHandle::from_hex(&"46".repeat(32)).unwrap();
        let data = Bytes::new();
        let signed = sign(
            &key,
            AccountTransfer {
                chain_id: 1,
                nonce: 9,
                gas_price: U256::from(20_000_000_000u64),
                gas_limit: 21_000,
                to: "0x3535353535353535353535353535353535353535".parse().unwrap(),
                value: U256::from(1_000_000_000_000_000_000u64),
                data: &data,
            },
        )
        .unwrap();

        assert_eq!(
            hex::encode(&signed.raw),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
        assert_eq!(signed.hash, keccak256(&signed.raw));
    }

    #[test]
    fn test_signed_envelope_decodes() {
        let key = KeyHandle::from_hex(TEST_PRIVATE_KEY).unwrap();
        let data = Bytes::new();
        let signed = sign(
            &key,
            AccountTransfer {
                chain_id: 137,
                nonce: 3,
                gas_price: U256::from(30_000_000_000u64),
                gas_limit: 21_000,
                to: Address::repeat_byte(0x11),
                value: U256::from(5u64),
                data: &data,
            },
        )
        .unwrap();

        let decoded = TxEnvelope::decode_2718(&mut signed.raw.as_slice()).unwrap();
        assert_eq!(*decoded.tx_hash(), signed.hash);
        let legacy = decoded.as_legacy().unwrap();
        assert_eq!(legacy.tx().chain_id, Some(137));
        assert_eq!(legacy.tx().nonce, 3);
    }

    #[test]
    fn test_oversized_gas_price_is_rejected() {
        let key = KeyHandle::from_hex(TEST_PRIVATE_KEY).unwrap();
        let data = Bytes::new();
        let result = sign(
            &key,
            AccountTransfer {
                chain_id: 1,
                nonce: 0,
                gas_price: U256::MAX,
                gas_limit: 21_000,
                to: Address::ZERO,
                value: U256::ZERO,
                data: &data,
            },
        );
        assert!(matches!(result, Err(SendError::InvalidAmount(_))));
    }
}
