//! Legacy System transfers for Solana.
//!
//! The message is compiled by `solana-transaction` (fee payer first, writable
//! accounts, then the System Program) and serialized with `bincode`. The
//! single fee-payer signature is produced here with Ed25519 over the
//! serialized message and placed in `signatures[0]`.

use std::str::FromStr;

use ed25519_dalek::{Signer as _, SigningKey};
use solana_hash::Hash;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_system_interface::instruction as system_instruction;
use solana_transaction::Transaction;

use crate::builder::SystemInstruction;
use crate::chain::address::parse_instruction_address;
use crate::chain::Chain;
use crate::error::{SendError, SendResult};
use crate::signer::KeyHandle;

fn signing_key(key: &KeyHandle) -> SendResult<SigningKey> {
    let signing_key = SigningKey::from_bytes(&key.secret()?);
    if let Some(public) = key.embedded_public() {
        if public != signing_key.verifying_key().as_bytes() {
            return Err(SendError::Key("keypair public half does not match its secret".to_string()));
        }
    }
    Ok(signing_key)
}

/// Base58 public key.
pub fn derive_address(key: &KeyHandle) -> SendResult<String> {
    Ok(bs58::encode(signing_key(key)?.verifying_key().as_bytes()).into_string())
}

fn pubkey(address: &str) -> SendResult<Pubkey> {
    parse_instruction_address(Chain::Solana, address).map(Pubkey::new_from_array)
}

/// Unsigned legacy transaction paying from `fee_payer`.
pub fn unsigned_transaction(
    fee_payer: &str,
    blockhash: &str,
    instructions: &[SystemInstruction],
) -> SendResult<Transaction> {
    let payer = pubkey(fee_payer)?;
    let recent = Hash::from_str(blockhash)
        .map_err(|e| SendError::invalid_address(Chain::Solana, blockhash, e.to_string()))?;

    let mut compiled = Vec::with_capacity(instructions.len());
    for instruction in instructions {
        let SystemInstruction::Transfer { from, to, lamports } = instruction;
        let from = pubkey(from)?;
        if from != payer {
            return Err(SendError::Signing("transfer source must be the fee payer".to_string()));
        }
        compiled.push(system_instruction::transfer(&from, &pubkey(to)?, *lamports));
    }

    let mut transaction = Transaction::new_with_payer(&compiled, Some(&payer));
    transaction.message.recent_blockhash = recent;
    Ok(transaction)
}

/// Wire transaction plus the Base58 signature that identifies it.
pub struct SignedInstruction {
    pub raw: Vec<u8>,
    pub signature: String,
}

pub fn sign(
    key: &KeyHandle,
    fee_payer: &str,
    blockhash: &str,
    instructions: &[SystemInstruction],
) -> SendResult<SignedInstruction> {
    let signing_key = signing_key(key)?;
    let mut transaction = unsigned_transaction(fee_payer, blockhash, instructions)?;
    if transaction.signatures.len() != 1 {
        return Err(SendError::Signing(format!(
            "expected one required signature, message needs {}",
            transaction.signatures.len()
        )));
    }

    let signature = Signature::from(signing_key.sign(&transaction.message_data()).to_bytes());
    transaction.signatures[0] = signature;

    let raw = bincode::serialize(&transaction)
        .map_err(|e| SendError::Signing(format!("transaction serialization failed: {}", e)))?;
    Ok(SignedInstruction {
        raw,
        signature: transaction.signatures[0].to_string(),
    })
}
