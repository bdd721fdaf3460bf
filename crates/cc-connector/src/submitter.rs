//! Assembly, signing and posting of cross-chain update transactions.

use std::sync::Arc;

use anyhow::{Context, Result};
use cc_rpc_client::ReceivingChainApi;
use cc_types::codec;
use cc_types::crypto::transaction_id;
use cc_types::{
    ChainId, CrossChainUpdateParams, Transaction, H256, MODULE_INTEROPERABILITY,
};

use crate::wallet::Wallet;

pub struct Submitter {
    receiving: Arc<dyn ReceivingChainApi>,
    wallet: Wallet,
    receiving_chain_id: ChainId,
    command: &'static str,
    fee: u64,
    /// Record the assembled transaction without posting it.
    dry_run: bool,
}

pub struct SubmitOutcome {
    pub nonce: u64,
    pub transaction_id: H256,
    pub transaction: Vec<u8>,
    pub posted: bool,
}

impl Submitter {
    pub fn new(
        receiving: Arc<dyn ReceivingChainApi>,
        wallet: Wallet,
        receiving_chain_id: ChainId,
        command: &'static str,
        fee: u64,
        dry_run: bool,
    ) -> Self {
        Submitter {
            receiving,
            wallet,
            receiving_chain_id,
            command,
            fee,
            dry_run,
        }
    }

    pub fn address(&self) -> String {
        self.wallet.address()
    }

    /// Wrap the params into a signed transaction at the given account nonce.
    pub fn transaction_for(
        &self,
        params: &CrossChainUpdateParams,
        nonce: u64,
    ) -> Result<(Transaction, Vec<u8>, H256)> {
        let unsigned = Transaction {
            module: MODULE_INTEROPERABILITY.to_string(),
            command: self.command.to_string(),
            nonce,
            fee: self.fee,
            sender_public_key: self.wallet.public_key(),
            params: codec::encode(params)?,
            signatures: Vec::new(),
        };
        let signed = self
            .wallet
            .sign_transaction(&unsigned, &self.receiving_chain_id)?;
        let id = transaction_id(&signed)?;
        let bytes = codec::encode(&signed)?;
        Ok((signed, bytes, id))
    }

    /// Sign and post one update at the relayer account's current nonce.
    pub async fn submit(&self, params: &CrossChainUpdateParams) -> Result<SubmitOutcome> {
        let nonce = self
            .receiving
            .get_auth_nonce(&self.wallet.address())
            .await?;
        let (_, bytes, id) = self.transaction_for(params, nonce)?;

        if self.dry_run {
            log::info!(
                "dry run: recorded ccu transaction 0x{} without posting",
                hex::encode(id)
            );
            return Ok(SubmitOutcome {
                nonce,
                transaction_id: id,
                transaction: bytes,
                posted: false,
            });
        }

        let posted_id = self
            .receiving
            .post_transaction(&bytes)
            .await
            .with_context(|| format!("post ccu transaction 0x{}", hex::encode(id)))?;
        log::info!(
            "posted ccu transaction 0x{} at nonce {}",
            hex::encode(posted_id),
            nonce
        );
        Ok(SubmitOutcome {
            nonce,
            transaction_id: posted_id,
            transaction: bytes,
            posted: true,
        })
    }
}
