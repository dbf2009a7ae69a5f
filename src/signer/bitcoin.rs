//! Legacy P2PKH signing for the UTXO chain.
//!
//! Inputs are spent with `SIGHASH_ALL` over the legacy digest computed by
//! `bitcoin::sighash::SighashCache`; the ECDSA signature itself comes from
//! `k256` and is normalized to low-S before DER encoding.

use std::str::FromStr;

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::builder::TxOutput;
use crate::chain::address::p2pkh_address;
use crate::chain::{Chain, UtxoAddress};
use crate::error::{SendError, SendResult};
use crate::signer::KeyHandle;
use crate::state::UnspentOutput;

fn signing_key(key: &KeyHandle) -> SendResult<SigningKey> {
    let secret = key.secret()?;
    SigningKey::from_slice(&secret).map_err(|e| SendError::Key(format!("invalid secp256k1 key: {}", e)))
}

fn compressed_public_key(key: &SigningKey) -> Vec<u8> {
    key.verifying_key().to_encoded_point(true).as_bytes().to_vec()
}

fn push_bytes(data: Vec<u8>) -> SendResult<PushBytesBuf> {
    PushBytesBuf::try_from(data).map_err(|e| SendError::Signing(format!("script push too large: {}", e)))
}

/// P2PKH address of the key's compressed public key.
pub fn derive_address(chain: Chain, key: &KeyHandle) -> SendResult<String> {
    p2pkh_address(chain, &compressed_public_key(&signing_key(key)?))
}

/// Signed transaction bytes and its txid (display byte order).
#[derive(Debug)]
pub struct SignedUtxo {
    pub raw: Vec<u8>,
    pub txid: String,
}

/// Transaction spending `inputs` to `outputs` with empty unlocking scripts.
pub fn unsigned_transaction(
    chain: Chain,
    inputs: &[UnspentOutput],
    outputs: &[TxOutput],
) -> SendResult<Transaction> {
    let input = inputs
        .iter()
        .map(|utxo| {
            let txid = Txid::from_str(&utxo.txid)
                .map_err(|e| SendError::Signing(format!("bad txid {}: {}", utxo.txid, e)))?;
            Ok(TxIn {
                previous_output: OutPoint::new(txid, utxo.output_index),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::default(),
            })
        })
        .collect::<SendResult<Vec<_>>>()?;

    let output = outputs
        .iter()
        .map(|out| {
            Ok(TxOut {
                value: Amount::from_sat(out.value),
                script_pubkey: UtxoAddress::parse(chain, &out.address)?.as_bitcoin().script_pubkey(),
            })
        })
        .collect::<SendResult<Vec<_>>>()?;

    Ok(Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input,
        output,
    })
}

pub fn sign(
    chain: Chain,
    key: &KeyHandle,
    inputs: &[UnspentOutput],
    outputs: &[TxOutput],
) -> SendResult<SignedUtxo> {
    let signing_key = signing_key(key)?;
    let public_key = compressed_public_key(&signing_key);
    let own_script = ScriptBuf::from_bytes(
        UtxoAddress::parse(chain, &p2pkh_address(chain, &public_key)?)?.script_pubkey(),
    );

    for input in inputs {
        let locking_script = hex::decode(&input.locking_script)
            .map_err(|e| SendError::Signing(format!("bad locking script: {}", e)))?;
        if locking_script != own_script.as_bytes() {
            return Err(SendError::Signing(format!(
                "input {}:{} is not locked to the signing key",
                input.txid, input.output_index
            )));
        }
    }

    let mut tx = unsigned_transaction(chain, inputs, outputs)?;
    let sighash_type = EcdsaSighashType::All;

    let mut script_sigs = Vec::with_capacity(tx.input.len());
    {
        let cache = SighashCache::new(&tx);
        for index in 0..tx.input.len() {
            let digest = cache
                .legacy_signature_hash(index, &own_script, sighash_type.to_u32())
                .map_err(|e| SendError::Signing(e.to_string()))?;
            let signature: Signature = signing_key
                .sign_prehash(&digest.to_byte_array())
                .map_err(|e| SendError::Signing(e.to_string()))?;
            let signature = signature.normalize_s().unwrap_or(signature);

            let mut der = signature.to_der().as_bytes().to_vec();
            der.push(sighash_type.to_u32() as u8);

            let script_sig = Builder::new()
                .push_slice(push_bytes(der)?)
                .push_slice(push_bytes(public_key.clone())?)
                .into_script();
            script_sigs.push(script_sig);
        }
    }

    for (input, script_sig) in tx.input.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }

    Ok(SignedUtxo {
        raw: encode::serialize(&tx),
        txid: tx.compute_txid().to_string(),
    })
}
