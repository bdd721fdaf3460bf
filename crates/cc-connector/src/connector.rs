//! The connector state machine.
//!
//! One worker consumes the serialized block feed of the sending chain. Each
//! new block is ingested by the observer; once the observed tip runs far
//! enough ahead of the last certified height, an update is assembled and
//! submitted, followed by a cleanup pass. Rollbacks drop the matching
//! records. Recoverable failures are logged and retried on the next block;
//! only store corruption and load-time misconfiguration surface to the host.

use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use cc_config::ConnectorConfig;
use cc_rpc_client::{BlockEvent, ReceivingChainApi, SendingChainApi};
use cc_store::{ConnectorStore, CorruptedRecord};
use cc_types::codec;
use cc_types::{
    mainchain_id, ActiveValidatorsUpdate, BlockHeader, ChainId, CrossChainUpdateParams,
    InboxUpdate, LastCertificate, SentCcu, COMMAND_SUBMIT_MAINCHAIN_CCU,
    COMMAND_SUBMIT_SIDECHAIN_CCU, MODULE_INTEROPERABILITY,
};
use parking_lot::RwLock;
use tokio::sync::Notify;

use crate::certificate::select_certificate;
use crate::cleanup::run_cleanup;
use crate::endpoint::{ConnectorEndpoint, ConnectorPhase, ConnectorStatus};
use crate::inbox_update::build_inbox_update;
use crate::observer::Observer;
use crate::submitter::Submitter;
use crate::validators_update::compute_validators_update;
use crate::wallet::Wallet;

/// Requests a graceful stop: the in-flight handler finishes, then the event
/// loop exits and the caller can drop the connector, which closes the
/// clients and the store.
pub struct ShutdownHandle {
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.notify.notify_one();
    }
}

pub struct Connector {
    store: ConnectorStore,
    sending: Arc<dyn SendingChainApi>,
    receiving: Arc<dyn ReceivingChainApi>,
    observer: Observer,
    submitter: Submitter,
    own_chain_id: ChainId,
    ccu_frequency: u32,
    max_ccu_size: u64,
    status: Arc<RwLock<ConnectorStatus>>,
    shutdown: Arc<Notify>,
}

fn is_fatal(err: &anyhow::Error) -> bool {
    err.is::<CorruptedRecord>()
}

impl Connector {
    /// Resolve everything the connector cannot run without: the relayer
    /// key, the sending chain's identity and outbox location, the receiving
    /// chain's identity and its current view of the sending chain. Any
    /// failure here is fatal.
    pub async fn load(
        config: &ConnectorConfig,
        store: ConnectorStore,
        sending: Arc<dyn SendingChainApi>,
        receiving: Arc<dyn ReceivingChainApi>,
    ) -> Result<(Self, ShutdownHandle)> {
        config.validate()?;
        let wallet = Wallet::from_privkey_path(&config.relayer_privkey_path)?;

        let own_account = sending
            .get_own_chain_account()
            .await
            .context("fetch own chain account")?;
        let metadata = sending
            .get_metadata()
            .await
            .context("fetch sending chain metadata")?;
        let interoperability = metadata
            .iter()
            .find(|module| module.name == MODULE_INTEROPERABILITY)
            .context("interoperability module missing from sending chain metadata")?;
        let outbox_key = [
            interoperability.store_prefix.as_slice(),
            own_account.chain_id.as_slice(),
        ]
        .concat();

        let node_info = receiving
            .get_node_info()
            .await
            .context("fetch receiving chain node info")?;
        ensure!(
            node_info.chain_id[0] == own_account.chain_id[0],
            "receiving chain {} is on a different network than own chain {}",
            hex::encode(node_info.chain_id),
            hex::encode(own_account.chain_id),
        );
        let command = if node_info.chain_id == mainchain_id(own_account.chain_id) {
            COMMAND_SUBMIT_MAINCHAIN_CCU
        } else {
            COMMAND_SUBMIT_SIDECHAIN_CCU
        };

        let chain_account = receiving
            .get_chain_account(own_account.chain_id)
            .await
            .context("sending chain is not registered on the receiving chain")?;
        store.set_last_certificate(&chain_account.last_certificate)?;

        let observer = Observer::new(
            store.clone(),
            sending.clone(),
            outbox_key,
            config.forward_bounced_ccms,
        );
        let submitter = Submitter::new(
            receiving.clone(),
            wallet,
            node_info.chain_id,
            command,
            config.ccu_fee,
            config.save_ccm,
        );

        let status = Arc::new(RwLock::new(ConnectorStatus {
            phase: ConnectorPhase::Ready,
            observed_tip: None,
            last_certificate_height: Some(chain_account.last_certificate.height),
            last_sent_ccm: store.last_sent_ccm()?,
        }));
        let shutdown = Arc::new(Notify::new());

        log::info!(
            "loaded connector for chain {} ({}), relaying to {} via {}",
            hex::encode(own_account.chain_id),
            own_account.name,
            hex::encode(node_info.chain_id),
            command,
        );
        Ok((
            Connector {
                store,
                sending,
                receiving,
                observer,
                submitter,
                own_chain_id: own_account.chain_id,
                ccu_frequency: config.ccu_frequency,
                max_ccu_size: config.max_ccu_size,
                status,
                shutdown: shutdown.clone(),
            },
            ShutdownHandle { notify: shutdown },
        ))
    }

    pub fn endpoint(&self) -> ConnectorEndpoint {
        ConnectorEndpoint::new(self.store.clone(), self.status.clone())
    }

    /// Consume block events until shutdown or the subscription ends. Events
    /// are handled strictly one at a time; shutdown is only observed between
    /// events, so an in-flight handler always completes.
    pub async fn run(&mut self) -> Result<()> {
        let mut events = self.sending.subscribe_blocks().await?;
        let shutdown = self.shutdown.clone();
        log::info!("connector ready, watching the sending chain");
        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                event = events.recv() => match event {
                    Some(BlockEvent::NewBlock(header)) => self.handle_new_block(&header).await?,
                    Some(BlockEvent::DeleteBlock(header)) => self.handle_delete_block(&header)?,
                    None => {
                        log::info!("block subscription ended");
                        break;
                    }
                },
            }
        }
        self.set_phase(ConnectorPhase::Ready);
        Ok(())
    }

    fn set_phase(&self, phase: ConnectorPhase) {
        self.status.write().phase = phase;
    }

    /// Returns an error only for fatal conditions; everything else is
    /// logged and retried when the next block arrives.
    async fn handle_new_block(&self, header: &BlockHeader) -> Result<()> {
        {
            let mut status = self.status.write();
            status.phase = ConnectorPhase::Observing;
            status.observed_tip = Some(header.height);
        }

        if let Err(err) = self.observer.on_new_block(header).await {
            if is_fatal(&err) {
                return Err(err);
            }
            log::warn!(
                "failed to ingest block {}: {:#}; retrying on the next block",
                header.height,
                err
            );
            self.set_phase(ConnectorPhase::Ready);
            return Ok(());
        }

        let last_certificate = self
            .store
            .last_certificate()?
            .context("last certificate missing after load")?;
        if header.height.saturating_sub(last_certificate.height) >= self.ccu_frequency {
            self.set_phase(ConnectorPhase::Building);
            match self.attempt_update(&last_certificate).await {
                Ok(()) => {}
                Err(err) if is_fatal(&err) => return Err(err),
                Err(err) => log::warn!(
                    "ccu attempt at height {} failed: {:#}; retrying next cadence",
                    header.height,
                    err
                ),
            }
        }

        let last_certificate_height = self.store.last_certificate()?.map(|c| c.height);
        let last_sent_ccm = self.store.last_sent_ccm()?;
        let mut status = self.status.write();
        status.phase = ConnectorPhase::Ready;
        status.last_certificate_height = last_certificate_height;
        status.last_sent_ccm = last_sent_ccm;
        Ok(())
    }

    fn handle_delete_block(&self, header: &BlockHeader) -> Result<()> {
        self.set_phase(ConnectorPhase::Rollback);
        log::info!("rolling back block at height {}", header.height);
        if let Err(err) = self.observer.on_delete_block(header) {
            if is_fatal(&err) {
                return Err(err);
            }
            log::warn!("rollback at height {} failed: {:#}", header.height, err);
        }
        let mut status = self.status.write();
        status.phase = ConnectorPhase::Ready;
        status.observed_tip = Some(header.height.saturating_sub(1));
        Ok(())
    }

    /// One assembly-and-submission pass at the current cadence.
    async fn attempt_update(&self, last_certificate: &LastCertificate) -> Result<()> {
        let bft_heights = self.sending.get_bft_heights().await?;
        let headers = self.store.block_headers()?;
        let commits = self.store.aggregate_commits()?;
        let validators = self.store.validators_data()?;

        let certificate = select_certificate(
            &headers,
            &commits,
            &validators,
            &bft_heights,
            last_certificate.height,
            &self.own_chain_id,
        )?;

        let (template, up_to_height) = match &certificate {
            Some(certificate_record) => {
                let (update, threshold) =
                    if certificate_record.validators_hash == last_certificate.validators_hash {
                        (ActiveValidatorsUpdate::default(), 0)
                    } else {
                        let prev = validators
                            .iter()
                            .find(|v| v.validators_hash == last_certificate.validators_hash)
                            .context("no validator set for the last certificate")?;
                        let new = validators
                            .iter()
                            .find(|v| v.validators_hash == certificate_record.validators_hash)
                            .context("no validator set for the new certificate")?;
                        compute_validators_update(prev, new)
                    };
                (
                    CrossChainUpdateParams {
                        sending_chain_id: self.own_chain_id,
                        certificate: codec::encode(certificate_record)?,
                        active_validators_update: update,
                        certificate_threshold: threshold,
                        inbox_update: InboxUpdate::default(),
                    },
                    certificate_record.height,
                )
            }
            // No new certificate: keep CCMs flowing below the height the
            // receiving chain already trusts.
            None => (
                CrossChainUpdateParams {
                    sending_chain_id: self.own_chain_id,
                    certificate: Vec::new(),
                    active_validators_update: ActiveValidatorsUpdate::default(),
                    certificate_threshold: 0,
                    inbox_update: InboxUpdate::default(),
                },
                last_certificate.height,
            ),
        };

        let records = self.store.cross_chain_messages()?;
        let last_sent = self.store.last_sent_ccm()?;
        let outcome = build_inbox_update(
            &records,
            last_sent,
            up_to_height,
            &template,
            self.max_ccu_size,
        )?;

        if certificate.is_none() && outcome.inbox_update.cross_chain_messages.is_empty() {
            log::debug!("no certificate and no pending ccms, skipping this cadence");
            return Ok(());
        }

        let mut params = template;
        params.inbox_update = outcome.inbox_update;

        self.set_phase(ConnectorPhase::Submitting);
        let submitted = self.submitter.submit(&params).await;

        // Mirror the receiving chain's view after every attempt; a rejected
        // transaction may still follow an accepted one from a prior pass.
        self.set_phase(ConnectorPhase::Cleanup);
        match self.receiving.get_chain_account(self.own_chain_id).await {
            Ok(account) => self.store.set_last_certificate(&account.last_certificate)?,
            Err(err) => log::warn!("failed to refresh the last certificate: {:#}", err),
        }

        match submitted {
            Ok(submit_outcome) => {
                if submit_outcome.posted {
                    if let Some(last) = outcome.last_included {
                        self.store.set_last_sent_ccm(&last)?;
                    }
                }
                self.store.prepend_sent_ccu(SentCcu {
                    nonce: submit_outcome.nonce,
                    transaction_id: submit_outcome.transaction_id,
                    transaction: submit_outcome.transaction,
                })?;
                run_cleanup(&self.store)?;
                Ok(())
            }
            Err(err) => {
                run_cleanup(&self.store)?;
                Err(err)
            }
        }
    }
}
