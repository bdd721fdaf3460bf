//! Minimal validator-set diffs for cross-chain updates.

use std::collections::BTreeMap;

use anyhow::{ensure, Result};
use cc_types::bitmap::{pack_update_bitmap, unpack_update_bitmap};
use cc_types::{ActiveValidator, ActiveValidatorsUpdate, ValidatorsData};

/// Diff `prev` into `new`.
///
/// Returns the update plus the threshold to carry in the CCU: the new
/// threshold when it changed, otherwise `0` as the unchanged signal. Equal
/// validators hashes short-circuit to the empty update.
pub fn compute_validators_update(
    prev: &ValidatorsData,
    new: &ValidatorsData,
) -> (ActiveValidatorsUpdate, u64) {
    if prev.validators_hash == new.validators_hash {
        return (ActiveValidatorsUpdate::default(), 0);
    }

    let prev_weights: BTreeMap<&[u8], u64> = prev
        .validators
        .iter()
        .map(|v| (v.bls_key.as_slice(), v.bft_weight))
        .collect();
    let new_weights: BTreeMap<&[u8], u64> = new
        .validators
        .iter()
        .map(|v| (v.bls_key.as_slice(), v.bft_weight))
        .collect();

    let bls_keys_update: Vec<Vec<u8>> = new_weights
        .keys()
        .filter(|key| !prev_weights.contains_key(*key))
        .map(|key| key.to_vec())
        .collect();

    // union of both key sets, lexicographic
    let mut union: Vec<&[u8]> = prev_weights.keys().chain(new_weights.keys()).copied().collect();
    union.sort_unstable();
    union.dedup();

    let mut bft_weights_update = Vec::new();
    let mut changed_bits = Vec::with_capacity(union.len());
    for key in &union {
        let weight_prev = prev_weights.get(key).copied().unwrap_or(0);
        let weight_new = new_weights.get(key).copied().unwrap_or(0);
        let changed = weight_new != weight_prev;
        if changed {
            bft_weights_update.push(weight_new);
        }
        changed_bits.push(changed);
    }

    let threshold = if new.certificate_threshold != prev.certificate_threshold {
        new.certificate_threshold
    } else {
        0
    };

    (
        ActiveValidatorsUpdate {
            bls_keys_update,
            bft_weights_update,
            bft_weights_update_bitmap: pack_update_bitmap(&changed_bits),
        },
        threshold,
    )
}

/// Apply an update to a previous validator list, the way the receiving
/// chain does. The diff is built to be a right inverse of this function.
pub fn apply_validators_update(
    prev: &[ActiveValidator],
    update: &ActiveValidatorsUpdate,
) -> Result<Vec<ActiveValidator>> {
    let mut union: Vec<Vec<u8>> = prev
        .iter()
        .map(|v| v.bls_key.clone())
        .chain(update.bls_keys_update.iter().cloned())
        .collect();
    union.sort_unstable();
    union.dedup();

    let changed = unpack_update_bitmap(&update.bft_weights_update_bitmap, union.len());
    let mut weights = update.bft_weights_update.iter();
    let prev_weights: BTreeMap<&[u8], u64> = prev
        .iter()
        .map(|v| (v.bls_key.as_slice(), v.bft_weight))
        .collect();

    let mut next = Vec::with_capacity(union.len());
    for (key, &is_changed) in union.iter().zip(changed.iter()) {
        let weight = if is_changed {
            *weights
                .next()
                .ok_or_else(|| anyhow::anyhow!("bft weights update shorter than its bitmap"))?
        } else {
            prev_weights.get(key.as_slice()).copied().unwrap_or(0)
        };
        if weight > 0 {
            next.push(ActiveValidator {
                bls_key: key.clone(),
                bft_weight: weight,
            });
        }
    }
    ensure!(weights.next().is_none(), "bft weights update longer than its bitmap");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_types::crypto::compute_validators_hash;

    fn validator(key: &[u8], weight: u64) -> ActiveValidator {
        ActiveValidator {
            bls_key: key.to_vec(),
            bft_weight: weight,
        }
    }

    fn data(validators: Vec<ActiveValidator>, threshold: u64) -> ValidatorsData {
        let validators_hash = compute_validators_hash(&validators, threshold).unwrap();
        ValidatorsData {
            validators_hash,
            certificate_threshold: threshold,
            validators,
        }
    }

    #[test]
    fn rotation_produces_the_documented_diff() {
        let bls_a = b"a-key".as_slice();
        let bls_b = b"b-key".as_slice();
        let bls_c = b"c-key".as_slice();
        let prev = data(vec![validator(bls_a, 10), validator(bls_b, 10)], 14);
        let new = data(vec![validator(bls_a, 10), validator(bls_c, 15)], 14);

        let (update, threshold) = compute_validators_update(&prev, &new);
        assert_eq!(update.bls_keys_update, vec![bls_c.to_vec()]);
        // b removed -> 0, c added -> 15
        assert_eq!(update.bft_weights_update, vec![0, 15]);
        assert_eq!(update.bft_weights_update_bitmap, vec![0x03]);
        assert_eq!(threshold, 0);
    }

    #[test]
    fn equal_hashes_signal_no_change() {
        let prev = data(vec![validator(b"a", 10)], 7);
        let (update, threshold) = compute_validators_update(&prev, &prev.clone());
        assert_eq!(update, ActiveValidatorsUpdate::default());
        assert_eq!(threshold, 0);
    }

    #[test]
    fn threshold_change_is_carried() {
        let prev = data(vec![validator(b"a", 10)], 7);
        let new = data(vec![validator(b"a", 10)], 8);
        let (update, threshold) = compute_validators_update(&prev, &new);
        assert_eq!(threshold, 8);
        // same validators, different threshold: no weight entries
        assert!(update.bft_weights_update.is_empty());
        assert!(update.bls_keys_update.is_empty());
    }

    #[test]
    fn diff_is_a_right_inverse_of_apply() {
        let cases = vec![
            (
                vec![validator(b"a", 10), validator(b"b", 10)],
                vec![validator(b"a", 10), validator(b"c", 15)],
            ),
            (
                vec![],
                vec![validator(b"a", 1), validator(b"b", 2), validator(b"c", 3)],
            ),
            (
                vec![validator(b"a", 1), validator(b"b", 2)],
                vec![],
            ),
            (
                vec![validator(b"a", 1), validator(b"b", 2), validator(b"c", 3)],
                vec![validator(b"a", 9), validator(b"c", 3), validator(b"d", 4)],
            ),
        ];
        for (prev, new) in cases {
            let prev_data = data(prev.clone(), 5);
            let new_data = data(new.clone(), 5);
            let (update, _) = compute_validators_update(&prev_data, &new_data);
            let applied = apply_validators_update(&prev, &update).unwrap();
            assert_eq!(applied, new, "prev={:?}", prev);
        }
    }

    #[test]
    fn apply_rejects_mismatched_weight_count() {
        let prev = vec![validator(b"a", 1)];
        let update = ActiveValidatorsUpdate {
            bls_keys_update: vec![b"b".to_vec()],
            bft_weights_update: vec![],
            bft_weights_update_bitmap: vec![0x01],
        };
        assert!(apply_validators_update(&prev, &update).is_err());
    }
}
