//! JSON-RPC clients for both chains.
//!
//! The connector talks to the sending chain over WS (block subscriptions
//! require a push transport) and to the receiving chain over WS or a Unix
//! socket. Wire DTOs live in [`jsonrpc`] and are converted into `cc-types`
//! records at the client boundary; the rest of the workspace never sees
//! JSON.

pub mod error;
pub mod jsonrpc;
pub mod receiving;
pub mod sending;
pub mod transport;

pub use error::RpcRequestError;
pub use receiving::{ReceivingChainApi, ReceivingChainClient};
pub use sending::{BlockEvent, SendingChainApi, SendingChainClient};
