//! Relayer key handling.

use std::path::Path;

use anyhow::{anyhow, ensure, Context, Result};
use cc_types::crypto::{hash, transaction_signing_message};
use cc_types::{ChainId, Transaction};
use fastcrypto::ed25519::{Ed25519KeyPair, Ed25519PrivateKey};
use fastcrypto::traits::{KeyPair, Signer, ToFromBytes};

pub struct Wallet {
    keypair: Ed25519KeyPair,
}

impl Wallet {
    pub fn new(keypair: Ed25519KeyPair) -> Self {
        Wallet { keypair }
    }

    /// Load the relayer key from a file holding 64 hex characters. Any
    /// problem here is fatal: the connector must not run without a key.
    pub fn from_privkey_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("read relayer privkey {}", path.as_ref().display()))?;
        let content = content.trim_start_matches("0x").trim();
        ensure!(content.len() == 64, "invalid relayer privkey length");
        let decoded = hex::decode(content).context("decode relayer privkey")?;
        let privkey = Ed25519PrivateKey::from_bytes(&decoded)
            .map_err(|err| anyhow!("invalid relayer privkey: {}", err))?;
        Ok(Wallet::new(Ed25519KeyPair::from(privkey)))
    }

    pub fn public_key(&self) -> Vec<u8> {
        self.keypair.public().as_bytes().to_vec()
    }

    /// Account address on the receiving chain: the first 20 bytes of the
    /// public key hash, hex encoded.
    pub fn address(&self) -> String {
        hex::encode(&hash(&self.public_key())[..20])
    }

    /// Sign a transaction destined for `chain_id`, replacing its signatures.
    pub fn sign_transaction(&self, tx: &Transaction, chain_id: &ChainId) -> Result<Transaction> {
        let message = transaction_signing_message(tx, chain_id)?;
        let signature = self.keypair.sign(&message);
        let mut signed = tx.clone();
        signed.signatures = vec![signature.as_bytes().to_vec()];
        Ok(signed)
    }
}
