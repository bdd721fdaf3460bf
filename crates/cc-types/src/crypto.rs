//! Hashing, signing inputs and aggregate-signature verification.

use anyhow::Result;
use fastcrypto::bls12381::min_sig::{BLS12381AggregateSignature, BLS12381PublicKey};
use fastcrypto::traits::{AggregateAuthenticator, ToFromBytes};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::bitmap::signer_bit;
use crate::codec;
use crate::{
    ActiveValidator, Certificate, ChainId, Transaction, ValidatorsData, H256,
    MESSAGE_TAG_CERTIFICATE, MESSAGE_TAG_TRANSACTION,
};

pub fn hash(data: &[u8]) -> H256 {
    Sha256::digest(data).into()
}

/// Canonical hash identifying a validator set and its threshold. The
/// validator list must already be sorted by BLS key.
pub fn compute_validators_hash(
    validators: &[ActiveValidator],
    certificate_threshold: u64,
) -> Result<H256> {
    let encoded = codec::encode(&(validators, certificate_threshold))?;
    Ok(hash(&encoded))
}

#[derive(Serialize)]
struct UnsignedCertificate<'a> {
    block_id: &'a H256,
    height: u32,
    timestamp: u32,
    state_root: &'a H256,
    validators_hash: &'a H256,
}

/// Message the validators signed for `certificate`: the certificate tag,
/// the sending chain id and the encoded certificate without its signature
/// material.
pub fn certificate_signing_message(certificate: &Certificate, chain_id: &ChainId) -> Result<Vec<u8>> {
    let encoded = codec::encode(&UnsignedCertificate {
        block_id: &certificate.block_id,
        height: certificate.height,
        timestamp: certificate.timestamp,
        state_root: &certificate.state_root,
        validators_hash: &certificate.validators_hash,
    })?;
    let mut message = Vec::with_capacity(MESSAGE_TAG_CERTIFICATE.len() + 4 + encoded.len());
    message.extend_from_slice(MESSAGE_TAG_CERTIFICATE);
    message.extend_from_slice(chain_id);
    message.extend_from_slice(&encoded);
    Ok(message)
}

/// Signing input of a receiving-chain transaction, tagged by the chain the
/// transaction is destined for.
pub fn transaction_signing_message(tx: &Transaction, chain_id: &ChainId) -> Result<Vec<u8>> {
    let unsigned = Transaction {
        signatures: Vec::new(),
        ..tx.clone()
    };
    let encoded = codec::encode(&unsigned)?;
    let mut message = Vec::with_capacity(MESSAGE_TAG_TRANSACTION.len() + 4 + encoded.len());
    message.extend_from_slice(MESSAGE_TAG_TRANSACTION);
    message.extend_from_slice(chain_id);
    message.extend_from_slice(&encoded);
    Ok(message)
}

pub fn transaction_id(tx: &Transaction) -> Result<H256> {
    Ok(hash(&codec::encode(tx)?))
}

/// Weighted aggregate verification of a certificate signature.
///
/// The aggregation bits select signers from the sorted validator list; the
/// signature verifies only if the selected weights reach the certificate
/// threshold and the BLS aggregate checks out over `message`. Any malformed
/// key or signature fails verification rather than erroring.
pub fn verify_weighted_aggregate(
    validators_data: &ValidatorsData,
    aggregation_bits: &[u8],
    signature: &[u8],
    message: &[u8],
) -> bool {
    let mut keys = Vec::new();
    let mut weight: u64 = 0;
    for (index, validator) in validators_data.validators.iter().enumerate() {
        if !signer_bit(aggregation_bits, index) {
            continue;
        }
        match BLS12381PublicKey::from_bytes(&validator.bls_key) {
            Ok(key) => keys.push(key),
            Err(_) => return false,
        }
        weight = weight.saturating_add(validator.bft_weight);
    }
    if keys.is_empty() || weight < validators_data.certificate_threshold {
        return false;
    }
    let aggregate = match BLS12381AggregateSignature::from_bytes(signature) {
        Ok(aggregate) => aggregate,
        Err(_) => return false,
    };
    aggregate.verify(&keys, message).is_ok()
}
