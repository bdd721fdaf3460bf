use serde::{Deserialize, Serialize};

pub type H256 = [u8; 32];

/// Chain identifier. The first byte is the network byte, the remaining three
/// identify the chain within the network.
pub type ChainId = [u8; 4];

pub const MODULE_INTEROPERABILITY: &str = "interoperability";
pub const EVENT_CCM_SEND_SUCCESS: &str = "ccmSendSuccess";
pub const EVENT_CCM_PROCESSED: &str = "ccmProcessed";
pub const COMMAND_SUBMIT_MAINCHAIN_CCU: &str = "submitMainchainCCU";
pub const COMMAND_SUBMIT_SIDECHAIN_CCU: &str = "submitSidechainCCU";

/// Domain separation tags prepended to signing inputs.
pub const MESSAGE_TAG_CERTIFICATE: &[u8] = b"CC_CE_";
pub const MESSAGE_TAG_TRANSACTION: &[u8] = b"CC_TX_";

/// The mainchain of a network is the chain whose non-network bytes are zero.
pub fn mainchain_id(chain_id: ChainId) -> ChainId {
    [chain_id[0], 0, 0, 0]
}

/// Sending-chain block header, reduced to the fields the connector uses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub id: H256,
    pub height: u32,
    pub timestamp: u32,
    pub state_root: H256,
    pub validators_hash: H256,
    pub aggregate_commit: Option<AggregateCommit>,
}

/// Aggregated BLS commitment to a certifiable height. An empty
/// `certificate_signature` means no commit was formed for the height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCommit {
    pub height: u32,
    pub aggregation_bits: Vec<u8>,
    pub certificate_signature: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveValidator {
    pub bls_key: Vec<u8>,
    pub bft_weight: u64,
}

/// Preimage of a `validators_hash`: the sorted validator list plus the
/// certificate threshold in force while that hash was the active set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorsData {
    pub validators_hash: H256,
    pub certificate_threshold: u64,
    pub validators: Vec<ActiveValidator>,
}

/// A BFT-signed commitment to a block header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub block_id: H256,
    pub height: u32,
    pub timestamp: u32,
    pub state_root: H256,
    pub validators_hash: H256,
    pub aggregation_bits: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Certificate {
    /// Certificate for `header`, carrying the signature material of `commit`.
    pub fn from_aggregate_commit(header: &BlockHeader, commit: &AggregateCommit) -> Self {
        Certificate {
            block_id: header.id,
            height: header.height,
            timestamp: header.timestamp,
            state_root: header.state_root,
            validators_hash: header.validators_hash,
            aggregation_bits: commit.aggregation_bits.clone(),
            signature: commit.certificate_signature.clone(),
        }
    }
}

/// The receiving chain's view of the sending chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCertificate {
    pub height: u32,
    pub timestamp: u32,
    pub state_root: H256,
    pub validators_hash: H256,
}

/// Cross-chain message emitted by the interoperability module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ccm {
    pub module: String,
    pub command: String,
    pub nonce: u64,
    pub fee: u64,
    pub sending_chain_id: ChainId,
    pub receiving_chain_id: ChainId,
    pub params: Vec<u8>,
    pub status: u32,
}

/// Sparse-merkle witness proving the outbox root against the state root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    pub bitmap: Vec<u8>,
    pub sibling_hashes: Vec<H256>,
}

/// CCMs observed at one sending-chain height together with the outbox-root
/// witness captured at that height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcmsAtHeight {
    pub height: u32,
    pub ccms: Vec<Ccm>,
    pub inclusion_proof: InclusionProof,
}

/// Position of the last CCM included in a submitted update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LastSentCcm {
    pub height: u32,
    pub nonce: u64,
}

/// Locally recorded submission, newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentCcu {
    pub nonce: u64,
    pub transaction_id: H256,
    pub transaction: Vec<u8>,
}

/// Minimal diff turning the previously certified validator set into the new
/// one. Empty vectors with a zero threshold signal "no change".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveValidatorsUpdate {
    pub bls_keys_update: Vec<Vec<u8>>,
    pub bft_weights_update: Vec<u64>,
    pub bft_weights_update_bitmap: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxUpdate {
    pub cross_chain_messages: Vec<Vec<u8>>,
    pub message_witness_hashes: Vec<H256>,
    pub outbox_root_witness: InclusionProof,
}

/// Parameters of a cross-chain update transaction. `certificate` holds the
/// encoded certificate, or is empty for a partial update without one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossChainUpdateParams {
    pub sending_chain_id: ChainId,
    pub certificate: Vec<u8>,
    pub active_validators_update: ActiveValidatorsUpdate,
    pub certificate_threshold: u64,
    pub inbox_update: InboxUpdate,
}

/// Receiving-chain transaction envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub module: String,
    pub command: String,
    pub nonce: u64,
    pub fee: u64,
    pub sender_public_key: Vec<u8>,
    pub params: Vec<u8>,
    pub signatures: Vec<Vec<u8>>,
}

/// BFT height watermarks of the sending chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BftHeights {
    pub max_height_prevoted: u32,
    pub max_height_precommitted: u32,
    pub max_height_certified: u32,
}

/// One event entry as returned by `chain_getEvents`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub module: String,
    pub name: String,
    pub data: Vec<u8>,
}

/// Outcome of processing a CCM on the sending chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CcmProcessedResult {
    Applied,
    Forwarded,
    Bounced,
    Discarded,
}

/// Payload of a `ccmSendSuccess` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcmSendSuccessData {
    pub ccm: Ccm,
}

/// Payload of a `ccmProcessed` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcmProcessedData {
    pub ccm: Ccm,
    pub result: CcmProcessedResult,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnChainAccount {
    pub chain_id: ChainId,
    pub name: String,
    pub nonce: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAccount {
    pub name: String,
    pub last_certificate: LastCertificate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub chain_id: ChainId,
}

/// Per-module metadata from `system_getMetadata`, used to locate the
/// interoperability store prefix and event names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    pub name: String,
    pub store_prefix: Vec<u8>,
    pub events: Vec<String>,
}

/// One query of a `state_prove` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProofQuery {
    pub bitmap: Vec<u8>,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProof {
    pub sibling_hashes: Vec<H256>,
    pub queries: Vec<StateProofQuery>,
}
