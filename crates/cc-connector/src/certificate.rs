//! Certificate selection from observed aggregate commits.

use anyhow::{Context, Result};
use cc_types::crypto::{certificate_signing_message, verify_weighted_aggregate};
use cc_types::{
    AggregateCommit, BftHeights, BlockHeader, Certificate, ChainId, ValidatorsData,
};

/// Pick the highest aggregate commit that yields a verifiable certificate
/// strictly above the last certified height.
///
/// Candidates are tried from the highest height down; one whose signature
/// does not verify under the validator set of its header is skipped
/// silently. A candidate whose header or validator set is missing from the
/// observed view aborts the pass instead, since that is a gap the next
/// blocks will fill.
///
/// Selection is deterministic: the same inputs yield the same certificate.
pub fn select_certificate(
    headers: &[BlockHeader],
    commits: &[AggregateCommit],
    validators_data: &[ValidatorsData],
    bft_heights: &BftHeights,
    last_certified_height: u32,
    chain_id: &ChainId,
) -> Result<Option<Certificate>> {
    let mut candidates: Vec<&AggregateCommit> = commits
        .iter()
        .filter(|commit| {
            commit.height > last_certified_height
                && commit.height <= bft_heights.max_height_certified
                && !commit.certificate_signature.is_empty()
        })
        .collect();
    candidates.sort_by(|a, b| b.height.cmp(&a.height));

    for commit in candidates {
        let header = headers
            .iter()
            .find(|header| header.height == commit.height)
            .with_context(|| {
                format!("no header for aggregate commit at height {}", commit.height)
            })?;
        let data = validators_data
            .iter()
            .find(|data| data.validators_hash == header.validators_hash)
            .with_context(|| {
                format!(
                    "no validator set {} for header at height {}",
                    hex::encode(header.validators_hash),
                    header.height
                )
            })?;

        let certificate = Certificate::from_aggregate_commit(header, commit);
        let message = certificate_signing_message(&certificate, chain_id)?;
        if verify_weighted_aggregate(
            data,
            &commit.aggregation_bits,
            &commit.certificate_signature,
            &message,
        ) {
            return Ok(Some(certificate));
        }
        log::debug!(
            "aggregate commit at height {} failed verification, trying lower",
            commit.height
        );
    }
    Ok(None)
}
