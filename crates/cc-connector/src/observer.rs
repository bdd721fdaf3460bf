//! Block and event ingest from the sending chain.

use std::sync::Arc;

use anyhow::Result;
use cc_rpc_client::SendingChainApi;
use cc_store::ConnectorStore;
use cc_types::codec;
use cc_types::{
    BlockHeader, Ccm, CcmProcessedData, CcmProcessedResult, CcmSendSuccessData, CcmsAtHeight,
    EventLog, InclusionProof, StateProof, EVENT_CCM_PROCESSED, EVENT_CCM_SEND_SUCCESS,
    MODULE_INTEROPERABILITY,
};

pub struct Observer {
    store: ConnectorStore,
    chain: Arc<dyn SendingChainApi>,
    outbox_key: Vec<u8>,
    forward_bounced: bool,
}

impl Observer {
    pub fn new(
        store: ConnectorStore,
        chain: Arc<dyn SendingChainApi>,
        outbox_key: Vec<u8>,
        forward_bounced: bool,
    ) -> Self {
        Observer {
            store,
            chain,
            outbox_key,
            forward_bounced,
        }
    }

    /// Ingest one new block: upsert the header, capture CCMs emitted at its
    /// height together with an outbox witness, record a newly seen validator
    /// set and the aggregate commit if the header carries one.
    ///
    /// Every write is an idempotent upsert, so replaying the same block is a
    /// no-op and a failed ingest can simply be retried on the next block.
    pub async fn on_new_block(&self, header: &BlockHeader) -> Result<()> {
        self.store.upsert_block_header(header)?;

        let events = self.chain.get_events(header.height).await?;
        if let Some(ccms) = extract_ccms(&events, self.forward_bounced) {
            let proof = self.chain.state_prove(&self.outbox_key).await?;
            self.store.upsert_cross_chain_messages(&CcmsAtHeight {
                height: header.height,
                ccms,
                inclusion_proof: inclusion_proof_from(&proof),
            })?;
        }

        let validators_data = self.chain.get_bft_parameters(header.height).await?;
        if self.store.insert_validators_data(&validators_data)? {
            log::debug!(
                "recorded validator set {} at height {}",
                hex::encode(validators_data.validators_hash),
                header.height
            );
        }

        if let Some(commit) = &header.aggregate_commit {
            self.store.upsert_aggregate_commit(commit)?;
        }
        Ok(())
    }

    /// Drop the records matching a deleted block. CCM records stay; the next
    /// cleanup at a certified height prunes them.
    pub fn on_delete_block(&self, header: &BlockHeader) -> Result<()> {
        self.store.delete_block_header_at(header.height)?;
        self.store.delete_aggregate_commit_at(header.height)?;
        self.store.delete_validators_data(&header.validators_hash)?;
        Ok(())
    }
}

/// CCMs relayed from one block's events, in emission order. `ccmSendSuccess`
/// always contributes its CCM; `ccmProcessed` only for a `Forwarded` result,
/// or a `Bounced` one when configured. A payload that fails to decode is
/// logged and skipped without hiding the remaining events.
pub fn extract_ccms(events: &[EventLog], forward_bounced: bool) -> Option<Vec<Ccm>> {
    let mut ccms = Vec::new();
    for event in events {
        if event.module != MODULE_INTEROPERABILITY {
            continue;
        }
        match event.name.as_str() {
            EVENT_CCM_SEND_SUCCESS => match codec::decode::<CcmSendSuccessData>(&event.data) {
                Ok(data) => ccms.push(data.ccm),
                Err(err) => log::warn!("discarding undecodable ccmSendSuccess event: {:#}", err),
            },
            EVENT_CCM_PROCESSED => match codec::decode::<CcmProcessedData>(&event.data) {
                Ok(data) => match data.result {
                    CcmProcessedResult::Forwarded => ccms.push(data.ccm),
                    CcmProcessedResult::Bounced if forward_bounced => ccms.push(data.ccm),
                    _ => {}
                },
                Err(err) => log::warn!("discarding undecodable ccmProcessed event: {:#}", err),
            },
            _ => {}
        }
    }
    if ccms.is_empty() {
        None
    } else {
        Some(ccms)
    }
}

fn inclusion_proof_from(proof: &StateProof) -> InclusionProof {
    InclusionProof {
        bitmap: proof
            .queries
            .first()
            .map(|query| query.bitmap.clone())
            .unwrap_or_default(),
        sibling_hashes: proof.sibling_hashes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ccm(nonce: u64) -> Ccm {
        Ccm {
            module: "token".into(),
            command: "transferCrossChain".into(),
            nonce,
            fee: 10,
            sending_chain_id: [4, 0, 0, 1],
            receiving_chain_id: [4, 0, 0, 0],
            params: vec![nonce as u8],
            status: 0,
        }
    }

    fn send_success_event(nonce: u64) -> EventLog {
        EventLog {
            module: MODULE_INTEROPERABILITY.into(),
            name: EVENT_CCM_SEND_SUCCESS.into(),
            data: codec::encode(&CcmSendSuccessData { ccm: ccm(nonce) }).unwrap(),
        }
    }

    fn processed_event(nonce: u64, result: CcmProcessedResult) -> EventLog {
        EventLog {
            module: MODULE_INTEROPERABILITY.into(),
            name: EVENT_CCM_PROCESSED.into(),
            data: codec::encode(&CcmProcessedData { ccm: ccm(nonce), result }).unwrap(),
        }
    }

    #[test]
    fn collects_sent_and_forwarded_ccms_in_order() {
        let events = vec![
            send_success_event(1),
            processed_event(2, CcmProcessedResult::Forwarded),
            processed_event(3, CcmProcessedResult::Applied),
            send_success_event(4),
        ];
        let ccms = extract_ccms(&events, false).unwrap();
        assert_eq!(ccms.iter().map(|c| c.nonce).collect::<Vec<_>>(), vec![1, 2, 4]);
    }

    #[test]
    fn bounced_ccms_are_opt_in() {
        let events = vec![processed_event(5, CcmProcessedResult::Bounced)];
        assert!(extract_ccms(&events, false).is_none());
        let ccms = extract_ccms(&events, true).unwrap();
        assert_eq!(ccms[0].nonce, 5);
    }

    #[test]
    fn foreign_modules_and_other_events_are_ignored() {
        let events = vec![
            EventLog {
                module: "token".into(),
                name: EVENT_CCM_SEND_SUCCESS.into(),
                data: codec::encode(&CcmSendSuccessData { ccm: ccm(1) }).unwrap(),
            },
            EventLog {
                module: MODULE_INTEROPERABILITY.into(),
                name: "chainAccountUpdated".into(),
                data: vec![1, 2, 3],
            },
        ];
        assert!(extract_ccms(&events, false).is_none());
    }

    #[test]
    fn undecodable_payload_skips_only_that_event() {
        let events = vec![
            EventLog {
                module: MODULE_INTEROPERABILITY.into(),
                name: EVENT_CCM_SEND_SUCCESS.into(),
                data: vec![0xff],
            },
            send_success_event(7),
        ];
        let ccms = extract_ccms(&events, false).unwrap();
        assert_eq!(ccms.len(), 1);
        assert_eq!(ccms[0].nonce, 7);
    }
}
