use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use cc_types::codec;
use cc_types::{
    AggregateCommit, BlockHeader, CcmsAtHeight, LastCertificate, LastSentCcm, SentCcu,
    ValidatorsData, H256,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::kv::KVStore;
use crate::rocks::RocksKV;
use crate::schema::*;
use crate::MemoryKV;

/// A persisted record failed to decode. Always fatal: the store contents
/// are not trustworthy once one family is unreadable.
#[derive(thiserror::Error, Debug)]
#[error("corrupted {record} record")]
pub struct CorruptedRecord {
    pub record: &'static str,
}

/// Typed view over the byte store. Cloning shares the underlying handle.
#[derive(Clone)]
pub struct ConnectorStore {
    kv: Arc<dyn KVStore>,
}

impl ConnectorStore {
    pub fn new(kv: Arc<dyn KVStore>) -> Self {
        ConnectorStore { kv }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Arc::new(RocksKV::open(path)?)))
    }

    pub fn open_in_memory() -> Self {
        Self::new(Arc::new(MemoryKV::new()))
    }

    fn get_list<T: DeserializeOwned>(&self, key: &[u8], record: &'static str) -> Result<Vec<T>> {
        match self.kv.get(key) {
            Some(bytes) => codec::decode(&bytes).context(CorruptedRecord { record }),
            None => Ok(Vec::new()),
        }
    }

    fn set_list<T: Serialize>(&self, key: &[u8], list: &[T]) -> Result<()> {
        self.kv.set(key, &codec::encode(&list)?)
    }

    fn get_record<T: DeserializeOwned>(
        &self,
        key: &[u8],
        record: &'static str,
    ) -> Result<Option<T>> {
        match self.kv.get(key) {
            Some(bytes) => codec::decode(&bytes)
                .map(Some)
                .context(CorruptedRecord { record }),
            None => Ok(None),
        }
    }

    fn set_record<T: Serialize>(&self, key: &[u8], value: &T) -> Result<()> {
        self.kv.set(key, &codec::encode(value)?)
    }

    pub fn block_headers(&self) -> Result<Vec<BlockHeader>> {
        self.get_list(KEY_BLOCK_HEADERS, "blockHeaders")
    }

    pub fn set_block_headers(&self, headers: &[BlockHeader]) -> Result<()> {
        self.set_list(KEY_BLOCK_HEADERS, headers)
    }

    pub fn aggregate_commits(&self) -> Result<Vec<AggregateCommit>> {
        self.get_list(KEY_AGGREGATE_COMMITS, "aggregateCommits")
    }

    pub fn set_aggregate_commits(&self, commits: &[AggregateCommit]) -> Result<()> {
        self.set_list(KEY_AGGREGATE_COMMITS, commits)
    }

    pub fn validators_data(&self) -> Result<Vec<ValidatorsData>> {
        self.get_list(KEY_VALIDATORS_HASH_PREIMAGE, "validatorsHashPreimage")
    }

    pub fn set_validators_data(&self, data: &[ValidatorsData]) -> Result<()> {
        self.set_list(KEY_VALIDATORS_HASH_PREIMAGE, data)
    }

    pub fn cross_chain_messages(&self) -> Result<Vec<CcmsAtHeight>> {
        self.get_list(KEY_CROSS_CHAIN_MESSAGES, "crossChainMessages")
    }

    pub fn set_cross_chain_messages(&self, records: &[CcmsAtHeight]) -> Result<()> {
        self.set_list(KEY_CROSS_CHAIN_MESSAGES, records)
    }

    pub fn last_sent_ccm(&self) -> Result<Option<LastSentCcm>> {
        self.get_record(KEY_LAST_SENT_CCM, "lastSentCCM")
    }

    pub fn set_last_sent_ccm(&self, last: &LastSentCcm) -> Result<()> {
        self.set_record(KEY_LAST_SENT_CCM, last)
    }

    pub fn last_certificate(&self) -> Result<Option<LastCertificate>> {
        self.get_record(KEY_LAST_CERTIFICATE, "lastCertificate")
    }

    pub fn set_last_certificate(&self, certificate: &LastCertificate) -> Result<()> {
        self.set_record(KEY_LAST_CERTIFICATE, certificate)
    }

    pub fn sent_ccus(&self) -> Result<Vec<SentCcu>> {
        self.get_list(KEY_LIST_OF_CCUS, "listOfCCUs")
    }

    pub fn set_sent_ccus(&self, ccus: &[SentCcu]) -> Result<()> {
        self.set_list(KEY_LIST_OF_CCUS, ccus)
    }

    /// Record a submission, newest nonce first.
    pub fn prepend_sent_ccu(&self, ccu: SentCcu) -> Result<()> {
        let mut ccus = self.sent_ccus()?;
        ccus.insert(0, ccu);
        ccus.sort_by(|a, b| b.nonce.cmp(&a.nonce));
        self.set_sent_ccus(&ccus)
    }

    /// Insert or replace the header at its height, keeping height order.
    /// A replacement at the tip is how reorged slots are overwritten.
    pub fn upsert_block_header(&self, header: &BlockHeader) -> Result<()> {
        let mut headers = self.block_headers()?;
        match headers.binary_search_by_key(&header.height, |h| h.height) {
            Ok(at) => headers[at] = header.clone(),
            Err(at) => headers.insert(at, header.clone()),
        }
        self.set_block_headers(&headers)
    }

    pub fn delete_block_header_at(&self, height: u32) -> Result<()> {
        let mut headers = self.block_headers()?;
        headers.retain(|h| h.height != height);
        self.set_block_headers(&headers)
    }

    pub fn upsert_aggregate_commit(&self, commit: &AggregateCommit) -> Result<()> {
        let mut commits = self.aggregate_commits()?;
        match commits.binary_search_by_key(&commit.height, |c| c.height) {
            Ok(at) => commits[at] = commit.clone(),
            Err(at) => commits.insert(at, commit.clone()),
        }
        self.set_aggregate_commits(&commits)
    }

    pub fn delete_aggregate_commit_at(&self, height: u32) -> Result<()> {
        let mut commits = self.aggregate_commits()?;
        commits.retain(|c| c.height != height);
        self.set_aggregate_commits(&commits)
    }

    /// Insert a validator set if its hash is not yet known. Returns whether
    /// the set was inserted.
    pub fn insert_validators_data(&self, data: &ValidatorsData) -> Result<bool> {
        let mut all = self.validators_data()?;
        if all.iter().any(|v| v.validators_hash == data.validators_hash) {
            return Ok(false);
        }
        all.push(data.clone());
        self.set_validators_data(&all)?;
        Ok(true)
    }

    pub fn delete_validators_data(&self, validators_hash: &H256) -> Result<()> {
        let mut all = self.validators_data()?;
        all.retain(|v| &v.validators_hash != validators_hash);
        self.set_validators_data(&all)
    }

    /// Insert or replace the CCM record at its height, keeping height order.
    pub fn upsert_cross_chain_messages(&self, record: &CcmsAtHeight) -> Result<()> {
        let mut records = self.cross_chain_messages()?;
        match records.binary_search_by_key(&record.height, |r| r.height) {
            Ok(at) => records[at] = record.clone(),
            Err(at) => records.insert(at, record.clone()),
        }
        self.set_cross_chain_messages(&records)
    }
}
