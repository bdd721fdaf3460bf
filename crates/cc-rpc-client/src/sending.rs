//! Client of the sending chain.

use anyhow::{Context, Result};
use async_jsonrpc_client::PubsubTransport;
use async_trait::async_trait;
use cc_types::{
    BftHeights, BlockHeader, EventLog, ModuleMetadata, OwnChainAccount, StateProof, ValidatorsData,
};
use futures::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;

use crate::error::RpcRequestError;
use crate::jsonrpc::{
    BftHeightsDto, BftParametersDto, BlockNotificationDto, EventLogDto, MetadataDto,
    OwnChainAccountDto, StateProveResponseDto,
};
use crate::transport::{named_params, RpcTransport, WsTransport};

const CLIENT_NAME: &str = "sending chain";

/// One entry of the serialized block feed.
#[derive(Clone, Debug)]
pub enum BlockEvent {
    NewBlock(BlockHeader),
    DeleteBlock(BlockHeader),
}

/// Everything the connector needs from the sending chain. Kept behind a
/// trait so tests can drive the connector with a scripted chain.
#[async_trait]
pub trait SendingChainApi: Send + Sync {
    /// Merge the `chain_newBlock` and `chain_deleteBlock` subscriptions
    /// into one FIFO channel, delivered in arrival order.
    async fn subscribe_blocks(&self) -> Result<mpsc::Receiver<BlockEvent>>;

    async fn get_events(&self, height: u32) -> Result<Vec<EventLog>>;
    async fn get_bft_parameters(&self, height: u32) -> Result<ValidatorsData>;
    async fn get_bft_heights(&self) -> Result<BftHeights>;
    async fn get_metadata(&self) -> Result<Vec<ModuleMetadata>>;
    async fn state_prove(&self, key: &[u8]) -> Result<StateProof>;
    async fn get_own_chain_account(&self) -> Result<OwnChainAccount>;
}

pub struct SendingChainClient {
    transport: WsTransport,
}

impl SendingChainClient {
    pub async fn connect(url: &str) -> Result<Self> {
        Ok(SendingChainClient {
            transport: WsTransport::connect(url, CLIENT_NAME).await?,
        })
    }
}

fn parse_block_header(payload: serde_json::Value) -> Result<BlockHeader> {
    let dto: BlockNotificationDto =
        serde_json::from_value(payload).context("parse block notification")?;
    dto.block_header.try_into()
}

#[async_trait]
impl SendingChainApi for SendingChainClient {
    async fn subscribe_blocks(&self) -> Result<mpsc::Receiver<BlockEvent>> {
        let client = self.transport.client();
        let (_, new_blocks) = client
            .subscribe("chain_newBlock", None)
            .await
            .map_err(|err| RpcRequestError::new(CLIENT_NAME, "chain_newBlock", err))?;
        let (_, deleted_blocks) = client
            .subscribe("chain_deleteBlock", None)
            .await
            .map_err(|err| RpcRequestError::new(CLIENT_NAME, "chain_deleteBlock", err))?;

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            let new_blocks = new_blocks.map(|notification| (true, notification));
            let deleted_blocks = deleted_blocks.map(|notification| (false, notification));
            let mut merged = futures::stream::select(new_blocks, deleted_blocks);
            while let Some((is_new, notification)) = merged.next().await {
                let event = match parse_block_header(notification.params.result) {
                    Ok(header) if is_new => BlockEvent::NewBlock(header),
                    Ok(header) => BlockEvent::DeleteBlock(header),
                    Err(err) => {
                        log::warn!("skipping malformed block notification: {:#}", err);
                        continue;
                    }
                };
                if tx.send(event).await.is_err() {
                    // Connector unloaded.
                    break;
                }
            }
        });
        Ok(rx)
    }

    async fn get_events(&self, height: u32) -> Result<Vec<EventLog>> {
        let value = self
            .transport
            .request("chain_getEvents", named_params(json!({ "height": height })))
            .await?;
        let dtos: Vec<EventLogDto> = serde_json::from_value(value).context("parse events")?;
        // A malformed entry must not hide the rest of the block's events.
        Ok(dtos
            .into_iter()
            .filter_map(|dto| match EventLog::try_from(dto) {
                Ok(event) => Some(event),
                Err(err) => {
                    log::warn!("skipping malformed event at height {}: {:#}", height, err);
                    None
                }
            })
            .collect())
    }

    async fn get_bft_parameters(&self, height: u32) -> Result<ValidatorsData> {
        let value = self
            .transport
            .request(
                "consensus_getBFTParameters",
                named_params(json!({ "height": height })),
            )
            .await?;
        let dto: BftParametersDto =
            serde_json::from_value(value).context("parse bft parameters")?;
        dto.try_into()
    }

    async fn get_bft_heights(&self) -> Result<BftHeights> {
        let value = self
            .transport
            .request("consensus_getBFTHeights", None)
            .await?;
        let dto: BftHeightsDto = serde_json::from_value(value).context("parse bft heights")?;
        Ok(BftHeights {
            max_height_prevoted: dto.max_height_prevoted,
            max_height_precommitted: dto.max_height_precommitted,
            max_height_certified: dto.max_height_certified,
        })
    }

    async fn get_metadata(&self) -> Result<Vec<ModuleMetadata>> {
        let value = self.transport.request("system_getMetadata", None).await?;
        let dto: MetadataDto = serde_json::from_value(value).context("parse metadata")?;
        dto.modules
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>>>()
    }

    async fn state_prove(&self, key: &[u8]) -> Result<StateProof> {
        let value = self
            .transport
            .request(
                "state_prove",
                named_params(json!({ "queries": [hex::encode(key)] })),
            )
            .await?;
        let dto: StateProveResponseDto =
            serde_json::from_value(value).context("parse state proof")?;
        dto.proof.try_into()
    }

    async fn get_own_chain_account(&self) -> Result<OwnChainAccount> {
        let value = self
            .transport
            .request("interoperability_getOwnChainAccount", None)
            .await?;
        let dto: OwnChainAccountDto =
            serde_json::from_value(value).context("parse own chain account")?;
        dto.try_into()
    }
}
