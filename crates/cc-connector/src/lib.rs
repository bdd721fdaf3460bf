//! The chain connector.
//!
//! Observes a sending chain block by block, keeps a sliding verified view of
//! its headers, aggregate commits, validator sets and outbox messages, and
//! relays that activity to a receiving chain as cross-chain update
//! transactions.

pub mod certificate;
pub mod cleanup;
pub mod connector;
pub mod endpoint;
pub mod inbox_update;
pub mod observer;
pub mod submitter;
pub mod validators_update;
pub mod wallet;

pub use connector::{Connector, ShutdownHandle};
pub use endpoint::{ConnectorEndpoint, ConnectorPhase, ConnectorStatus};
