//! Binary codec for persisted records and signing inputs.
//!
//! Everything the connector persists or hashes goes through these helpers so
//! the encoding stays uniform: bincode with the default length-delimited
//! layout for collections.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).context("encode record")
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).context("decode record")
}

/// Encoded size without materializing the bytes.
pub fn encoded_len<T: Serialize>(value: &T) -> Result<u64> {
    bincode::serialized_size(value).context("measure record")
}
