//! Client of the receiving chain.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cc_types::{ChainAccount, ChainId, NodeInfo, H256};
use serde_json::json;

use crate::jsonrpc::{
    h256_from_hex, AuthAccountDto, ChainAccountDto, NodeInfoDto, PostTransactionResponseDto,
};
use crate::transport::{named_params, IpcTransport, RpcTransport, WsTransport};

const CLIENT_NAME: &str = "receiving chain";

/// Everything the connector needs from the receiving chain.
#[async_trait]
pub trait ReceivingChainApi: Send + Sync {
    /// The receiving chain's account of the sending chain, holding the last
    /// accepted certificate.
    async fn get_chain_account(&self, chain_id: ChainId) -> Result<ChainAccount>;
    async fn get_auth_nonce(&self, address: &str) -> Result<u64>;
    async fn get_node_info(&self) -> Result<NodeInfo>;
    /// Post a signed transaction, returning its id.
    async fn post_transaction(&self, transaction: &[u8]) -> Result<H256>;
}

pub struct ReceivingChainClient {
    transport: Box<dyn RpcTransport>,
}

impl ReceivingChainClient {
    /// Connect over exactly one of the two supported transports.
    pub async fn connect(ipc_path: Option<&Path>, ws_url: Option<&str>) -> Result<Self> {
        let transport: Box<dyn RpcTransport> = match (ipc_path, ws_url) {
            (Some(path), None) => Box::new(IpcTransport::new(path, CLIENT_NAME)),
            (None, Some(url)) => Box::new(WsTransport::connect(url, CLIENT_NAME).await?),
            _ => anyhow::bail!("exactly one receiving chain transport must be configured"),
        };
        Ok(ReceivingChainClient { transport })
    }
}

#[async_trait]
impl ReceivingChainApi for ReceivingChainClient {
    async fn get_chain_account(&self, chain_id: ChainId) -> Result<ChainAccount> {
        let value = self
            .transport
            .request(
                "interoperability_getChainAccount",
                named_params(json!({ "chainID": hex::encode(chain_id) })),
            )
            .await?;
        let dto: ChainAccountDto = serde_json::from_value(value).context("parse chain account")?;
        dto.try_into()
    }

    async fn get_auth_nonce(&self, address: &str) -> Result<u64> {
        let value = self
            .transport
            .request(
                "auth_getAuthAccount",
                named_params(json!({ "address": address })),
            )
            .await?;
        let dto: AuthAccountDto = serde_json::from_value(value).context("parse auth account")?;
        Ok(dto.nonce)
    }

    async fn get_node_info(&self) -> Result<NodeInfo> {
        let value = self.transport.request("system_getNodeInfo", None).await?;
        let dto: NodeInfoDto = serde_json::from_value(value).context("parse node info")?;
        dto.try_into()
    }

    async fn post_transaction(&self, transaction: &[u8]) -> Result<H256> {
        let value = self
            .transport
            .request(
                "txpool_postTransaction",
                named_params(json!({ "transaction": hex::encode(transaction) })),
            )
            .await?;
        let dto: PostTransactionResponseDto =
            serde_json::from_value(value).context("parse post transaction response")?;
        h256_from_hex(&dto.transaction_id)
    }
}
