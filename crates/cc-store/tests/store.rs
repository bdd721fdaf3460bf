use cc_store::ConnectorStore;
use cc_types::{
    AggregateCommit, BlockHeader, CcmsAtHeight, InclusionProof, LastCertificate, LastSentCcm,
    SentCcu, ValidatorsData,
};

fn header(height: u32) -> BlockHeader {
    BlockHeader {
        id: [height as u8; 32],
        height,
        timestamp: height * 10,
        state_root: [1u8; 32],
        validators_hash: [2u8; 32],
        aggregate_commit: None,
    }
}

#[test]
fn typed_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = ConnectorStore::open(dir.path()).unwrap();
        store.upsert_block_header(&header(5)).unwrap();
        store.upsert_block_header(&header(6)).unwrap();
        store
            .set_last_certificate(&LastCertificate {
                height: 4,
                timestamp: 40,
                state_root: [1u8; 32],
                validators_hash: [2u8; 32],
            })
            .unwrap();
        store
            .set_last_sent_ccm(&LastSentCcm { height: 5, nonce: 3 })
            .unwrap();
    }

    let store = ConnectorStore::open(dir.path()).unwrap();
    let headers = store.block_headers().unwrap();
    assert_eq!(
        headers.iter().map(|h| h.height).collect::<Vec<_>>(),
        vec![5, 6]
    );
    assert_eq!(store.last_certificate().unwrap().unwrap().height, 4);
    assert_eq!(
        store.last_sent_ccm().unwrap(),
        Some(LastSentCcm { height: 5, nonce: 3 })
    );
}

#[test]
fn upsert_replaces_the_slot_at_a_height() {
    let store = ConnectorStore::open_in_memory();
    store.upsert_block_header(&header(7)).unwrap();

    let mut reorged = header(7);
    reorged.id = [0xaa; 32];
    store.upsert_block_header(&reorged).unwrap();

    let headers = store.block_headers().unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].id, [0xaa; 32]);
}

#[test]
fn upserts_keep_height_order() {
    let store = ConnectorStore::open_in_memory();
    for height in [9, 7, 8] {
        store.upsert_block_header(&header(height)).unwrap();
        store
            .upsert_aggregate_commit(&AggregateCommit {
                height,
                aggregation_bits: vec![],
                certificate_signature: vec![],
            })
            .unwrap();
    }
    let heights: Vec<u32> = store
        .block_headers()
        .unwrap()
        .iter()
        .map(|h| h.height)
        .collect();
    assert_eq!(heights, vec![7, 8, 9]);
    let commit_heights: Vec<u32> = store
        .aggregate_commits()
        .unwrap()
        .iter()
        .map(|c| c.height)
        .collect();
    assert_eq!(commit_heights, vec![7, 8, 9]);
}

#[test]
fn validators_data_inserts_only_new_hashes() {
    let store = ConnectorStore::open_in_memory();
    let data = ValidatorsData {
        validators_hash: [3u8; 32],
        certificate_threshold: 10,
        validators: vec![],
    };
    assert!(store.insert_validators_data(&data).unwrap());
    assert!(!store.insert_validators_data(&data).unwrap());
    assert_eq!(store.validators_data().unwrap().len(), 1);

    store.delete_validators_data(&[3u8; 32]).unwrap();
    assert!(store.validators_data().unwrap().is_empty());
}

#[test]
fn ccm_records_replace_per_height() {
    let store = ConnectorStore::open_in_memory();
    let record = CcmsAtHeight {
        height: 20,
        ccms: vec![],
        inclusion_proof: InclusionProof::default(),
    };
    store.upsert_cross_chain_messages(&record).unwrap();
    store.upsert_cross_chain_messages(&record).unwrap();
    assert_eq!(store.cross_chain_messages().unwrap().len(), 1);
}

#[test]
fn sent_ccus_are_ordered_by_nonce_descending() {
    let store = ConnectorStore::open_in_memory();
    for nonce in [1u64, 3, 2] {
        store
            .prepend_sent_ccu(SentCcu {
                nonce,
                transaction_id: [nonce as u8; 32],
                transaction: vec![nonce as u8],
            })
            .unwrap();
    }
    let nonces: Vec<u64> = store.sent_ccus().unwrap().iter().map(|c| c.nonce).collect();
    assert_eq!(nonces, vec![3, 2, 1]);
}
