//! Inbox update assembly: CCM batch plus witnesses, under a size budget.

use anyhow::{bail, Result};
use cc_types::codec;
use cc_types::merkle::{leaf_hash, right_witness};
use cc_types::{
    Ccm, CcmsAtHeight, CrossChainUpdateParams, InboxUpdate, InclusionProof, LastSentCcm,
};

/// An assembled inbox update and the position the last-sent cursor moves to
/// once the carrying transaction is accepted.
#[derive(Clone, Debug)]
pub struct InboxUpdateOutcome {
    pub inbox_update: InboxUpdate,
    pub last_included: Option<LastSentCcm>,
}

struct PendingCcm<'a> {
    height: u32,
    nonce: u64,
    serialized: Vec<u8>,
    record: &'a CcmsAtHeight,
}

/// Build the largest inbox update that keeps the whole CCU under
/// `max_ccu_size` bytes.
///
/// Pending CCMs are the ones recorded after `last_sent` up to
/// `up_to_height` (the certificate height, or the already certified height
/// when no new certificate is available), in `(height, emission)` order.
/// When the batch stops short of the full pending set, the update carries
/// the right-hand Merkle witness proving the included prefix against the
/// outbox root, and the outbox-root witness of the last included record.
///
/// `template` must hold the final certificate and validator-update fields;
/// the size budget is checked against the encoded whole.
pub fn build_inbox_update(
    records: &[CcmsAtHeight],
    last_sent: Option<LastSentCcm>,
    up_to_height: u32,
    template: &CrossChainUpdateParams,
    max_ccu_size: u64,
) -> Result<InboxUpdateOutcome> {
    let pending = gather_pending(records, last_sent, up_to_height)?;

    let mut included = pending.len();
    loop {
        let outcome = assemble(&pending, included)?;
        let mut params = template.clone();
        params.inbox_update = outcome.inbox_update.clone();
        if codec::encoded_len(&params)? <= max_ccu_size {
            if included < pending.len() {
                log::info!(
                    "inbox update truncated to {} of {} pending ccms by the size budget",
                    included,
                    pending.len()
                );
            }
            return Ok(outcome);
        }
        if included == 0 {
            bail!(
                "cross-chain update exceeds max_ccu_size ({}) even without messages",
                max_ccu_size
            );
        }
        included -= 1;
    }
}

fn gather_pending(
    records: &[CcmsAtHeight],
    last_sent: Option<LastSentCcm>,
    up_to_height: u32,
) -> Result<Vec<PendingCcm<'_>>> {
    let mut pending = Vec::new();
    for record in records {
        if record.height > up_to_height {
            continue;
        }
        if let Some(last) = last_sent {
            if record.height < last.height {
                continue;
            }
            if record.height == last.height {
                // the cursor sits inside this record; skip what was sent
                for ccm in record.ccms.iter().filter(|ccm| ccm.nonce > last.nonce) {
                    pending.push(pending_entry(record, ccm)?);
                }
                continue;
            }
        }
        for ccm in &record.ccms {
            pending.push(pending_entry(record, ccm)?);
        }
    }
    Ok(pending)
}

fn pending_entry<'a>(record: &'a CcmsAtHeight, ccm: &Ccm) -> Result<PendingCcm<'a>> {
    Ok(PendingCcm {
        height: record.height,
        nonce: ccm.nonce,
        serialized: codec::encode(ccm)?,
        record,
    })
}

fn assemble(pending: &[PendingCcm<'_>], included: usize) -> Result<InboxUpdateOutcome> {
    let cross_chain_messages: Vec<Vec<u8>> = pending[..included]
        .iter()
        .map(|p| p.serialized.clone())
        .collect();

    let message_witness_hashes = if included == pending.len() {
        Vec::new()
    } else {
        let leaves: Vec<_> = pending.iter().map(|p| leaf_hash(&p.serialized)).collect();
        right_witness(&leaves, included)
    };

    let outbox_root_witness = pending[..included]
        .last()
        .map(|p| p.record.inclusion_proof.clone())
        .unwrap_or_else(InclusionProof::default);

    Ok(InboxUpdateOutcome {
        inbox_update: InboxUpdate {
            cross_chain_messages,
            message_witness_hashes,
            outbox_root_witness,
        },
        last_included: pending[..included].last().map(|p| LastSentCcm {
            height: p.height,
            nonce: p.nonce,
        }),
    })
}
