//! Core data model shared by the connector crates.
//!
//! Records persisted by the store, parameters of cross-chain update
//! transactions and the crypto helpers that tie them together live here so
//! that the store, the RPC clients and the connector agree on one encoding.

pub mod bitmap;
pub mod codec;
pub mod crypto;
pub mod merkle;
mod types;

pub use types::*;
