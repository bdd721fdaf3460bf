//! Key layout of the connector store.
//!
//! Every record family lives under a fixed single-byte key; list-valued
//! keys hold the encoded array of all records of that family.

pub const KEY_BLOCK_HEADERS: &[u8] = &[0x01];
pub const KEY_AGGREGATE_COMMITS: &[u8] = &[0x02];
pub const KEY_VALIDATORS_HASH_PREIMAGE: &[u8] = &[0x03];
pub const KEY_CROSS_CHAIN_MESSAGES: &[u8] = &[0x04];
pub const KEY_LAST_SENT_CCM: &[u8] = &[0x05];
pub const KEY_LIST_OF_CCUS: &[u8] = &[0x06];
pub const KEY_LAST_CERTIFICATE: &[u8] = &[0x07];
