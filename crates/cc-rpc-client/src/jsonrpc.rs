//! Wire DTOs of both chain APIs.
//!
//! Byte fields travel as bare hex strings, numbers as JSON numbers. Each
//! DTO converts into its `cc-types` record; a malformed field is a decode
//! error on that item only.

use anyhow::{anyhow, Context, Result};
use cc_types::{
    AggregateCommit, BlockHeader, ChainAccount, ChainId, EventLog, LastCertificate,
    ActiveValidator, ModuleMetadata, NodeInfo, OwnChainAccount, StateProof, StateProofQuery,
    ValidatorsData, H256,
};
use serde::{Deserialize, Serialize};

pub fn bytes_from_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s.trim_start_matches("0x")).context("hex field")
}

pub fn h256_from_hex(s: &str) -> Result<H256> {
    let bytes = bytes_from_hex(s)?;
    bytes
        .try_into()
        .map_err(|_| anyhow!("expected 32-byte hex field"))
}

pub fn chain_id_from_hex(s: &str) -> Result<ChainId> {
    let bytes = bytes_from_hex(s)?;
    bytes
        .try_into()
        .map_err(|_| anyhow!("expected 4-byte chain id"))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateCommitDto {
    pub height: u32,
    pub aggregation_bits: String,
    pub certificate_signature: String,
}

impl TryFrom<AggregateCommitDto> for AggregateCommit {
    type Error = anyhow::Error;

    fn try_from(dto: AggregateCommitDto) -> Result<Self> {
        Ok(AggregateCommit {
            height: dto.height,
            aggregation_bits: bytes_from_hex(&dto.aggregation_bits)?,
            certificate_signature: bytes_from_hex(&dto.certificate_signature)?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeaderDto {
    pub id: String,
    pub height: u32,
    pub timestamp: u32,
    pub state_root: String,
    pub validators_hash: String,
    #[serde(default)]
    pub aggregate_commit: Option<AggregateCommitDto>,
}

impl TryFrom<BlockHeaderDto> for BlockHeader {
    type Error = anyhow::Error;

    fn try_from(dto: BlockHeaderDto) -> Result<Self> {
        Ok(BlockHeader {
            id: h256_from_hex(&dto.id)?,
            height: dto.height,
            timestamp: dto.timestamp,
            state_root: h256_from_hex(&dto.state_root)?,
            validators_hash: h256_from_hex(&dto.validators_hash)?,
            aggregate_commit: dto.aggregate_commit.map(TryInto::try_into).transpose()?,
        })
    }
}

/// Payload of `chain_newBlock` / `chain_deleteBlock` notifications.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockNotificationDto {
    pub block_header: BlockHeaderDto,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogDto {
    pub module: String,
    pub name: String,
    pub data: String,
}

impl TryFrom<EventLogDto> for EventLog {
    type Error = anyhow::Error;

    fn try_from(dto: EventLogDto) -> Result<Self> {
        Ok(EventLog {
            module: dto.module,
            name: dto.name,
            data: bytes_from_hex(&dto.data)?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveValidatorDto {
    pub bls_key: String,
    pub bft_weight: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BftParametersDto {
    pub validators_hash: String,
    pub certificate_threshold: u64,
    pub validators: Vec<ActiveValidatorDto>,
}

impl TryFrom<BftParametersDto> for ValidatorsData {
    type Error = anyhow::Error;

    fn try_from(dto: BftParametersDto) -> Result<Self> {
        let mut validators = dto
            .validators
            .into_iter()
            .map(|v| {
                Ok(ActiveValidator {
                    bls_key: bytes_from_hex(&v.bls_key)?,
                    bft_weight: v.bft_weight,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        validators.sort_by(|a, b| a.bls_key.cmp(&b.bls_key));
        Ok(ValidatorsData {
            validators_hash: h256_from_hex(&dto.validators_hash)?,
            certificate_threshold: dto.certificate_threshold,
            validators,
        })
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BftHeightsDto {
    pub max_height_prevoted: u32,
    pub max_height_precommitted: u32,
    pub max_height_certified: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMetadataDto {
    pub name: String,
    pub store_prefix: String,
    #[serde(default)]
    pub events: Vec<String>,
}

impl TryFrom<ModuleMetadataDto> for ModuleMetadata {
    type Error = anyhow::Error;

    fn try_from(dto: ModuleMetadataDto) -> Result<Self> {
        Ok(ModuleMetadata {
            name: dto.name,
            store_prefix: bytes_from_hex(&dto.store_prefix)?,
            events: dto.events,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDto {
    pub modules: Vec<ModuleMetadataDto>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateProofQueryDto {
    pub bitmap: String,
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateProofDto {
    pub sibling_hashes: Vec<String>,
    pub queries: Vec<StateProofQueryDto>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateProveResponseDto {
    pub proof: StateProofDto,
}

impl TryFrom<StateProofDto> for StateProof {
    type Error = anyhow::Error;

    fn try_from(dto: StateProofDto) -> Result<Self> {
        Ok(StateProof {
            sibling_hashes: dto
                .sibling_hashes
                .iter()
                .map(|h| h256_from_hex(h))
                .collect::<Result<Vec<_>>>()?,
            queries: dto
                .queries
                .into_iter()
                .map(|q| {
                    Ok(StateProofQuery {
                        bitmap: bytes_from_hex(&q.bitmap)?,
                        key: bytes_from_hex(&q.key)?,
                        value: bytes_from_hex(&q.value)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnChainAccountDto {
    pub chain_id: String,
    pub name: String,
    pub nonce: u64,
}

impl TryFrom<OwnChainAccountDto> for OwnChainAccount {
    type Error = anyhow::Error;

    fn try_from(dto: OwnChainAccountDto) -> Result<Self> {
        Ok(OwnChainAccount {
            chain_id: chain_id_from_hex(&dto.chain_id)?,
            name: dto.name,
            nonce: dto.nonce,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastCertificateDto {
    pub height: u32,
    pub timestamp: u32,
    pub state_root: String,
    pub validators_hash: String,
}

impl TryFrom<LastCertificateDto> for LastCertificate {
    type Error = anyhow::Error;

    fn try_from(dto: LastCertificateDto) -> Result<Self> {
        Ok(LastCertificate {
            height: dto.height,
            timestamp: dto.timestamp,
            state_root: h256_from_hex(&dto.state_root)?,
            validators_hash: h256_from_hex(&dto.validators_hash)?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainAccountDto {
    pub name: String,
    pub last_certificate: LastCertificateDto,
}

impl TryFrom<ChainAccountDto> for ChainAccount {
    type Error = anyhow::Error;

    fn try_from(dto: ChainAccountDto) -> Result<Self> {
        Ok(ChainAccount {
            name: dto.name,
            last_certificate: dto.last_certificate.try_into()?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfoDto {
    pub chain_id: String,
}

impl TryFrom<NodeInfoDto> for NodeInfo {
    type Error = anyhow::Error;

    fn try_from(dto: NodeInfoDto) -> Result<Self> {
        Ok(NodeInfo {
            chain_id: chain_id_from_hex(&dto.chain_id)?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthAccountDto {
    pub nonce: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTransactionResponseDto {
    pub transaction_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_header_dto_decodes_hex_fields() {
        let dto: BlockHeaderDto = serde_json::from_value(serde_json::json!({
            "id": hex::encode([1u8; 32]),
            "height": 11,
            "timestamp": 110,
            "stateRoot": hex::encode([2u8; 32]),
            "validatorsHash": hex::encode([3u8; 32]),
            "aggregateCommit": {
                "height": 9,
                "aggregationBits": "07",
                "certificateSignature": "",
            },
        }))
        .unwrap();
        let header: BlockHeader = dto.try_into().unwrap();
        assert_eq!(header.height, 11);
        assert_eq!(header.id, [1u8; 32]);
        let commit = header.aggregate_commit.unwrap();
        assert_eq!(commit.aggregation_bits, vec![0x07]);
        assert!(commit.certificate_signature.is_empty());
    }

    #[test]
    fn bft_parameters_sort_validators_by_key() {
        let dto = BftParametersDto {
            validators_hash: hex::encode([4u8; 32]),
            certificate_threshold: 7,
            validators: vec![
                ActiveValidatorDto {
                    bls_key: "0b".into(),
                    bft_weight: 2,
                },
                ActiveValidatorDto {
                    bls_key: "0a".into(),
                    bft_weight: 1,
                },
            ],
        };
        let data: ValidatorsData = dto.try_into().unwrap();
        assert_eq!(data.validators[0].bls_key, vec![0x0a]);
        assert_eq!(data.validators[1].bls_key, vec![0x0b]);
    }

    #[test]
    fn malformed_hex_is_an_error() {
        assert!(bytes_from_hex("zz").is_err());
        assert!(h256_from_hex("0a0b").is_err());
        assert!(chain_id_from_hex("00000001ff").is_err());
    }
}
