//! Destination and source address parsing for each chain family.
//!
//! # Formats
//! - UTXO: anything `bitcoin::Address` parses, checked against the network
//! - Account: `0x` + 40 hex digits, EIP-55 checksum enforced on mixed case
//! - Instruction: Base58 encoding of a 32-byte public key

use std::str::FromStr;

use alloy::primitives::Address;
use bitcoin::address::{Address as BitcoinAddress, AddressType, NetworkUnchecked};
use bitcoin::Network;

use crate::chain::{Chain, ChainFamily};
use crate::error::{SendError, SendResult};

pub(crate) fn utxo_network(chain: Chain) -> Network {
    match chain {
        Chain::BitcoinTestnet => Network::Testnet,
        _ => Network::Bitcoin,
    }
}

/// A UTXO-chain destination checked against the chain's network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoAddress(BitcoinAddress);

impl UtxoAddress {
    pub fn parse(chain: Chain, address: &str) -> SendResult<Self> {
        if chain.family() != ChainFamily::Utxo {
            return Err(SendError::invalid_address(chain, address, "not a UTXO chain"));
        }
        let unchecked = BitcoinAddress::<NetworkUnchecked>::from_str(address)
            .map_err(|e| SendError::invalid_address(chain, address, e.to_string()))?;
        unchecked
            .require_network(utxo_network(chain))
            .map(UtxoAddress)
            .map_err(|_| SendError::invalid_address(chain, address, "address belongs to another network"))
    }

    pub fn is_p2pkh(&self) -> bool {
        self.0.address_type() == Some(AddressType::P2pkh)
    }

    /// Locking script paying to this address.
    pub fn script_pubkey(&self) -> Vec<u8> {
        self.0.script_pubkey().into_bytes()
    }

    pub fn as_bitcoin(&self) -> &BitcoinAddress {
        &self.0
    }
}

/// P2PKH address for a SEC1-encoded public key.
pub fn p2pkh_address(chain: Chain, public_key: &[u8]) -> SendResult<String> {
    let key = bitcoin::PublicKey::from_slice(public_key)
        .map_err(|e| SendError::Key(format!("invalid public key: {}", e)))?;
    Ok(BitcoinAddress::p2pkh(&key, utxo_network(chain)).to_string())
}

/// Parses an account-chain address, enforcing EIP-55 on mixed-case input.
pub fn parse_account_address(chain: Chain, address: &str) -> SendResult<Address> {
    let hex_part = address
        .strip_prefix("0x")
        .ok_or_else(|| SendError::invalid_address(chain, address, "missing 0x prefix"))?;
    if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SendError::invalid_address(chain, address, "expected 40 hex digits"));
    }

    let has_lower = hex_part.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex_part.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(address, None)
            .map_err(|_| SendError::invalid_address(chain, address, "EIP-55 checksum mismatch"));
    }

    address
        .parse::<Address>()
        .map_err(|e| SendError::invalid_address(chain, address, e.to_string()))
}

/// Parses an instruction-chain public key.
pub fn parse_instruction_address(chain: Chain, address: &str) -> SendResult<[u8; 32]> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| SendError::invalid_address(chain, address, e.to_string()))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        SendError::invalid_address(
            chain,
            address,
            format!("decoded length {} is not 32", bytes.len()),
        )
    })
}

/// Validates `address` for `chain` without keeping the decoded form.
pub fn validate_address(chain: Chain, address: &str) -> SendResult<()> {
    match chain.family() {
        ChainFamily::Utxo => UtxoAddress::parse(chain, address).map(|_| ()),
        ChainFamily::Account => parse_account_address(chain, address).map(|_| ()),
        ChainFamily::Instruction => parse_instruction_address(chain, address).map(|_| ()),
    }
}

/// Compares two addresses the way the chain treats them (hex is case-insensitive).
pub fn same_address(chain: Chain, left: &str, right: &str) -> bool {
    match chain.family() {
        ChainFamily::Account => left.eq_ignore_ascii_case(right),
        ChainFamily::Utxo | ChainFamily::Instruction => left == right,
    }
}
