//! Pruning of records below the last certified height.

use std::collections::BTreeSet;

use anyhow::Result;
use cc_store::ConnectorStore;
use cc_types::H256;

/// Drop headers, aggregate commits and CCM records below the last certified
/// height, then drop validator sets no retained header (nor the certificate
/// itself) references.
pub fn run_cleanup(store: &ConnectorStore) -> Result<()> {
    let last_certificate = match store.last_certificate()? {
        Some(certificate) => certificate,
        None => return Ok(()),
    };
    let horizon = last_certificate.height;

    let mut headers = store.block_headers()?;
    headers.retain(|header| header.height >= horizon);
    store.set_block_headers(&headers)?;

    let mut commits = store.aggregate_commits()?;
    commits.retain(|commit| commit.height >= horizon);
    store.set_aggregate_commits(&commits)?;

    let mut records = store.cross_chain_messages()?;
    records.retain(|record| record.height >= horizon);
    store.set_cross_chain_messages(&records)?;

    let referenced: BTreeSet<H256> = headers
        .iter()
        .map(|header| header.validators_hash)
        .chain([last_certificate.validators_hash])
        .collect();
    let mut validators = store.validators_data()?;
    let before = validators.len();
    validators.retain(|data| referenced.contains(&data.validators_hash));
    store.set_validators_data(&validators)?;

    log::debug!(
        "cleanup at height {}: {} headers, {} commits, {} ccm records, {} validator sets ({} dropped)",
        horizon,
        headers.len(),
        commits.len(),
        records.len(),
        validators.len(),
        before - validators.len(),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_types::{
        AggregateCommit, BlockHeader, CcmsAtHeight, InclusionProof, LastCertificate,
        ValidatorsData,
    };

    fn header(height: u32, validators_hash: H256) -> BlockHeader {
        BlockHeader {
            id: [height as u8; 32],
            height,
            timestamp: height,
            state_root: [0u8; 32],
            validators_hash,
            aggregate_commit: None,
        }
    }

    fn validators(hash: H256) -> ValidatorsData {
        ValidatorsData {
            validators_hash: hash,
            certificate_threshold: 1,
            validators: vec![],
        }
    }

    #[test]
    fn prunes_below_the_certified_height() {
        let store = ConnectorStore::open_in_memory();
        for height in 8..=12 {
            store.upsert_block_header(&header(height, [1u8; 32])).unwrap();
            store
                .upsert_aggregate_commit(&AggregateCommit {
                    height,
                    aggregation_bits: vec![],
                    certificate_signature: vec![],
                })
                .unwrap();
            store
                .upsert_cross_chain_messages(&CcmsAtHeight {
                    height,
                    ccms: vec![],
                    inclusion_proof: InclusionProof::default(),
                })
                .unwrap();
        }
        store
            .set_last_certificate(&LastCertificate {
                height: 10,
                timestamp: 100,
                state_root: [0u8; 32],
                validators_hash: [1u8; 32],
            })
            .unwrap();

        run_cleanup(&store).unwrap();

        let heights: Vec<u32> = store
            .block_headers()
            .unwrap()
            .iter()
            .map(|h| h.height)
            .collect();
        assert_eq!(heights, vec![10, 11, 12]);
        assert!(store.aggregate_commits().unwrap().iter().all(|c| c.height >= 10));
        assert!(store
            .cross_chain_messages()
            .unwrap()
            .iter()
            .all(|r| r.height >= 10));
    }

    #[test]
    fn keeps_validator_sets_still_referenced() {
        let store = ConnectorStore::open_in_memory();
        // certified set, a retained header's set and an orphaned set
        store.insert_validators_data(&validators([1u8; 32])).unwrap();
        store.insert_validators_data(&validators([2u8; 32])).unwrap();
        store.insert_validators_data(&validators([3u8; 32])).unwrap();
        store.upsert_block_header(&header(11, [2u8; 32])).unwrap();
        store
            .set_last_certificate(&LastCertificate {
                height: 10,
                timestamp: 100,
                state_root: [0u8; 32],
                validators_hash: [1u8; 32],
            })
            .unwrap();

        run_cleanup(&store).unwrap();

        let hashes: Vec<H256> = store
            .validators_data()
            .unwrap()
            .iter()
            .map(|v| v.validators_hash)
            .collect();
        assert!(hashes.contains(&[1u8; 32]));
        assert!(hashes.contains(&[2u8; 32]));
        assert!(!hashes.contains(&[3u8; 32]));
    }

    #[test]
    fn no_certificate_means_no_pruning() {
        let store = ConnectorStore::open_in_memory();
        store.upsert_block_header(&header(3, [1u8; 32])).unwrap();
        run_cleanup(&store).unwrap();
        assert_eq!(store.block_headers().unwrap().len(), 1);
    }
}
