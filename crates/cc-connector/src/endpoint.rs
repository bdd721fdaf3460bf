//! Read-only surface the plugin host exposes to users.

use std::sync::Arc;

use anyhow::Result;
use cc_store::ConnectorStore;
use cc_types::{LastSentCcm, SentCcu};
use parking_lot::RwLock;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectorPhase {
    Init,
    Ready,
    Observing,
    Building,
    Submitting,
    Cleanup,
    Rollback,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorStatus {
    pub phase: ConnectorPhase,
    pub observed_tip: Option<u32>,
    pub last_certificate_height: Option<u32>,
    pub last_sent_ccm: Option<LastSentCcm>,
}

impl Default for ConnectorStatus {
    fn default() -> Self {
        ConnectorStatus {
            phase: ConnectorPhase::Init,
            observed_tip: None,
            last_certificate_height: None,
            last_sent_ccm: None,
        }
    }
}

/// Handle onto the connector's state, cheap to clone into an RPC registry.
#[derive(Clone)]
pub struct ConnectorEndpoint {
    store: ConnectorStore,
    status: Arc<RwLock<ConnectorStatus>>,
}

impl ConnectorEndpoint {
    pub fn new(store: ConnectorStore, status: Arc<RwLock<ConnectorStatus>>) -> Self {
        ConnectorEndpoint { store, status }
    }

    /// Submitted update transactions, newest nonce first.
    pub fn sent_ccus(&self) -> Result<Vec<SentCcu>> {
        self.store.sent_ccus()
    }

    pub fn status(&self) -> ConnectorStatus {
        self.status.read().clone()
    }
}
