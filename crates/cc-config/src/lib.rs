//! Connector configuration.

use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Minimum block gap between the observed tip and the last certified height
/// before an update is attempted.
pub const DEFAULT_CCU_FREQUENCY: u32 = 10;
/// Byte budget for an assembled cross-chain update.
pub const DEFAULT_MAX_CCU_SIZE: u64 = 10 * 1024;
pub const DEFAULT_CCU_FEE: u64 = 1_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorConfig {
    /// Directory of the connector's key-value store.
    pub store_path: PathBuf,
    /// WS address of the sending chain node (block subscriptions require WS).
    pub sending_chain_ws_url: String,
    /// Receiving chain over a Unix socket. Mutually exclusive with
    /// `receiving_chain_ws_url`.
    #[serde(default)]
    pub receiving_chain_ipc_path: Option<PathBuf>,
    /// Receiving chain over WS. Mutually exclusive with
    /// `receiving_chain_ipc_path`.
    #[serde(default)]
    pub receiving_chain_ws_url: Option<String>,
    /// File holding the relayer private key as 64 hex characters.
    pub relayer_privkey_path: PathBuf,
    #[serde(default = "default_ccu_frequency")]
    pub ccu_frequency: u32,
    #[serde(default = "default_max_ccu_size")]
    pub max_ccu_size: u64,
    #[serde(default = "default_ccu_fee")]
    pub ccu_fee: u64,
    /// Record assembled updates without posting them.
    #[serde(default)]
    pub save_ccm: bool,
    /// Also relay CCMs whose processing result was `Bounced`.
    #[serde(default)]
    pub forward_bounced_ccms: bool,
}

fn default_ccu_frequency() -> u32 {
    DEFAULT_CCU_FREQUENCY
}

fn default_max_ccu_size() -> u64 {
    DEFAULT_MAX_CCU_SIZE
}

fn default_ccu_fee() -> u64 {
    DEFAULT_CCU_FEE
}

impl ConnectorConfig {
    /// Reject configurations the connector must not start with.
    pub fn validate(&self) -> Result<()> {
        match (&self.receiving_chain_ipc_path, &self.receiving_chain_ws_url) {
            (None, None) => {
                bail!("either receiving_chain_ipc_path or receiving_chain_ws_url is required")
            }
            (Some(_), Some(_)) => {
                bail!("receiving_chain_ipc_path and receiving_chain_ws_url are mutually exclusive")
            }
            _ => {}
        }
        if self.ccu_frequency == 0 {
            bail!("ccu_frequency must be at least 1");
        }
        if self.max_ccu_size == 0 {
            bail!("max_ccu_size must be positive");
        }
        Ok(())
    }
}
