//! Outbox message tree.
//!
//! An unbalanced binary Merkle tree over serialized CCMs: the left subtree
//! of `n` leaves covers the largest power of two below `n`. Leaf and branch
//! nodes are domain-separated so a leaf can never be replayed as a branch.
//!
//! Besides the root, the tree yields a *right witness* for a leaf prefix:
//! the subtree roots that, combined with the prefix, reproduce the full
//! root. A partial inbox update ships this witness so the receiving chain
//! can check the included prefix against the certified outbox root.

use anyhow::{ensure, Result};
use sha2::{Digest, Sha256};

use crate::H256;

const LEAF_PREFIX: u8 = 0x00;
const BRANCH_PREFIX: u8 = 0x01;

pub fn empty_hash() -> H256 {
    Sha256::digest([]).into()
}

pub fn leaf_hash(data: &[u8]) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(data);
    hasher.finalize().into()
}

pub fn branch_hash(left: &H256, right: &H256) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update([BRANCH_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Largest power of two strictly below `n`. `n` must be at least 2.
fn split_point(n: usize) -> usize {
    debug_assert!(n >= 2);
    let next = n.next_power_of_two();
    if next == n {
        n / 2
    } else {
        next / 2
    }
}

fn subtree_root(leaves: &[H256]) -> H256 {
    match leaves.len() {
        0 => empty_hash(),
        1 => leaves[0],
        n => {
            let split = split_point(n);
            branch_hash(&subtree_root(&leaves[..split]), &subtree_root(&leaves[split..]))
        }
    }
}

/// Root of the tree over `leaves` (already-hashed leaf values).
pub fn merkle_root(leaves: &[H256]) -> H256 {
    subtree_root(leaves)
}

/// Root of the tree over raw leaf payloads.
pub fn merkle_root_of(payloads: &[Vec<u8>]) -> H256 {
    let leaves: Vec<H256> = payloads.iter().map(|p| leaf_hash(p)).collect();
    subtree_root(&leaves)
}

/// Subtree roots covering `leaves[prefix..]`, ordered as consumed by
/// [`root_from_prefix`]. Empty when the prefix is the whole tree.
pub fn right_witness(leaves: &[H256], prefix: usize) -> Vec<H256> {
    assert!(prefix <= leaves.len(), "prefix exceeds leaf count");
    let mut out = Vec::new();
    collect_witness(leaves, prefix, &mut out);
    out
}

fn collect_witness(leaves: &[H256], prefix: usize, out: &mut Vec<H256>) {
    if prefix == leaves.len() {
        return;
    }
    if prefix == 0 {
        out.push(subtree_root(leaves));
        return;
    }
    let split = split_point(leaves.len());
    if prefix <= split {
        collect_witness(&leaves[..split], prefix, out);
        out.push(subtree_root(&leaves[split..]));
    } else {
        collect_witness(&leaves[split..], prefix - split, out);
    }
}

/// Reconstruct the full root from a leaf prefix, its right witness and the
/// total leaf count. Errors when the witness is too short for the shape.
pub fn root_from_prefix(prefix_leaves: &[H256], witness: &[H256], total: usize) -> Result<H256> {
    ensure!(prefix_leaves.len() <= total, "prefix exceeds leaf count");
    let mut iter = witness.iter();
    let root = rebuild(prefix_leaves, &mut iter, total)?;
    ensure!(iter.next().is_none(), "trailing witness hashes");
    Ok(root)
}

fn rebuild<'a>(
    prefix: &[H256],
    witness: &mut impl Iterator<Item = &'a H256>,
    total: usize,
) -> Result<H256> {
    if prefix.len() == total {
        return Ok(subtree_root(prefix));
    }
    if prefix.is_empty() {
        return witness.next().copied().ok_or_else(|| anyhow::anyhow!("witness exhausted"));
    }
    let split = split_point(total);
    if prefix.len() <= split {
        let left = rebuild(prefix, witness, split)?;
        let right = witness
            .next()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("witness exhausted"))?;
        Ok(branch_hash(&left, &right))
    } else {
        let left = subtree_root(&prefix[..split]);
        let right = rebuild(&prefix[split..], witness, total - split)?;
        Ok(branch_hash(&left, &right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<H256> {
        (0..n).map(|i| leaf_hash(&[i as u8])).collect()
    }

    #[test]
    fn single_leaf_root_is_the_leaf() {
        let l = leaves(1);
        assert_eq!(merkle_root(&l), l[0]);
    }

    #[test]
    fn empty_tree_root_is_empty_hash() {
        assert_eq!(merkle_root(&[]), empty_hash());
    }

    #[test]
    fn root_splits_at_power_of_two() {
        let l = leaves(5);
        let left = branch_hash(
            &branch_hash(&l[0], &l[1]),
            &branch_hash(&l[2], &l[3]),
        );
        assert_eq!(merkle_root(&l), branch_hash(&left, &l[4]));
    }

    #[test]
    fn right_witness_closes_the_root_for_every_prefix() {
        for n in 1..=17usize {
            let l = leaves(n);
            let root = merkle_root(&l);
            for prefix in 0..=n {
                let witness = right_witness(&l, prefix);
                let rebuilt = root_from_prefix(&l[..prefix], &witness, n).unwrap();
                assert_eq!(rebuilt, root, "n={} prefix={}", n, prefix);
            }
        }
    }

    #[test]
    fn full_prefix_needs_no_witness() {
        let l = leaves(6);
        assert!(right_witness(&l, 6).is_empty());
    }

    #[test]
    fn partial_prefix_has_nonempty_witness() {
        let l = leaves(6);
        assert!(!right_witness(&l, 4).is_empty());
    }

    #[test]
    fn wrong_witness_changes_the_root() {
        let l = leaves(6);
        let root = merkle_root(&l);
        let mut witness = right_witness(&l, 4);
        witness[0][0] ^= 0xff;
        let rebuilt = root_from_prefix(&l[..4], &witness, 6).unwrap();
        assert_ne!(rebuilt, root);
    }

    #[test]
    fn short_witness_is_rejected() {
        let l = leaves(6);
        assert!(root_from_prefix(&l[..4], &[], 6).is_err());
    }
}
