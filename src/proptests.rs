// Property tests for Sequence and ChainMap.
//
// Sequence: replay random push/remove/set ops against a Vec model and check
// contents plus the exact capacity transition after every step.
//
// ChainMap: replay random add/remove/lookup ops against std's HashMap with a
// deliberately weak strategy (many collisions) and a keyed SipHash strategy.
// After every step the key sets must match, bindings must sit in their home
// bucket, and the bucket count must follow the grow/shrink triggers.
use alloc::vec::Vec;
use std::collections::HashMap;
use std::collections::HashSet;

use proptest::prelude::*;
use siphasher::sip::SipHasher;

use crate::chain_map::BucketIndex;
use crate::chain_map::ChainMap;
use crate::policy::DefaultPolicy;
use crate::policy::ResizePolicy;
use crate::sequence::Sequence;

#[derive(Debug, Clone)]
enum SeqOp {
    Push(u32),
    Remove(usize),
    Set(usize, u32),
}

fn seq_op() -> impl Strategy<Value = SeqOp> {
    prop_oneof![
        3 => any::<u32>().prop_map(SeqOp::Push),
        2 => (0usize..80).prop_map(SeqOp::Remove),
        1 => (0usize..80, any::<u32>()).prop_map(|(i, v)| SeqOp::Set(i, v)),
    ]
}

#[derive(Debug, Clone, Copy)]
enum MapOp {
    Add(usize, usize),
    Remove(usize),
    Lookup(usize),
}

fn map_op(keys: usize) -> impl Strategy<Value = MapOp> {
    prop_oneof![
        4 => (0..keys, 0usize..4).prop_map(|(k, v)| MapOp::Add(k, v)),
        3 => (0..keys).prop_map(MapOp::Remove),
        1 => (0..keys).prop_map(MapOp::Lookup),
    ]
}

fn run_map_model<'a, S: BucketIndex<u32>>(
    mut map: ChainMap<'a, u32, u32, S>,
    keys: &'a [u32],
    values: &'a [u32],
    ops: &[MapOp],
) -> Result<(), TestCaseError> {
    let mut model: HashMap<u32, u32> = HashMap::new();

    for op in ops {
        let buckets_before = map.bucket_count();
        match *op {
            MapOp::Add(k, v) => {
                let present = model.contains_key(&keys[k]);
                let added = map.add(&keys[k], &values[v]);
                prop_assert_eq!(added, !present);
                model.insert(keys[k], values[v]);

                let expected = if !present
                    && model.len() > buckets_before * DefaultPolicy::UP_SCALE
                {
                    buckets_before * DefaultPolicy::UP_SCALE
                } else {
                    buckets_before
                };
                prop_assert_eq!(map.bucket_count(), expected);
            }
            MapOp::Remove(k) => {
                let expected_removed = model.remove(&keys[k]).map(|_| keys[k]);
                let removed = map.remove(&keys[k]).copied();
                prop_assert_eq!(removed, expected_removed);

                let expected = if removed.is_some()
                    && buckets_before > 1
                    && model.len() * DefaultPolicy::DOWN_TRIGGER < buckets_before
                {
                    buckets_before / DefaultPolicy::DOWN_SCALE
                } else {
                    buckets_before
                };
                prop_assert_eq!(map.bucket_count(), expected);
            }
            MapOp::Lookup(k) => {
                prop_assert_eq!(map.lookup(&keys[k]).copied(), model.get(&keys[k]).copied());
            }
        }

        map.assert_invariants();
        prop_assert_eq!(map.len(), model.len());
        let stored: HashSet<u32> = map.get_keys().iter().map(|k| **k).collect();
        let expected: HashSet<u32> = model.keys().copied().collect();
        prop_assert_eq!(stored, expected);
    }

    for (key, value) in &model {
        prop_assert_eq!(map.lookup(key), Some(value));
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_sequence_matches_vec(ops in proptest::collection::vec(seq_op(), 1..300)) {
        let mut seq: Sequence<u32> = Sequence::new();
        let mut model: Vec<u32> = Vec::new();

        for op in ops {
            let capacity_before = seq.capacity();
            match op {
                SeqOp::Push(v) => {
                    seq.push_back(v);
                    model.push(v);
                    let expected = match capacity_before {
                        0 => 2,
                        c if model.len() > c => c * 2,
                        c => c,
                    };
                    prop_assert_eq!(seq.capacity(), expected);
                }
                SeqOp::Remove(i) => {
                    let expected_value = (i < model.len()).then(|| model.remove(i));
                    prop_assert_eq!(seq.remove(i), expected_value);
                    let expected = if expected_value.is_some() && 4 * model.len() < capacity_before {
                        capacity_before / 2
                    } else {
                        capacity_before
                    };
                    prop_assert_eq!(seq.capacity(), expected);
                }
                SeqOp::Set(i, v) => {
                    let previous = model.get_mut(i).map(|slot| core::mem::replace(slot, v));
                    prop_assert_eq!(seq.set(i, v), previous);
                    prop_assert_eq!(seq.capacity(), capacity_before);
                }
            }
            prop_assert!(seq.len() <= seq.capacity());
            prop_assert_eq!(seq.as_slice(), model.as_slice());
        }
    }

    #[test]
    fn prop_chain_map_matches_model_colliding(ops in proptest::collection::vec(map_op(24), 1..300)) {
        let keys: Vec<u32> = (0..24).collect();
        let values: Vec<u32> = (100..104).collect();
        let map = ChainMap::with_fns(
            |a: &u32, b: &u32| a == b,
            |k: &u32, buckets: usize| (*k as usize / 3) % buckets,
        );
        run_map_model(map, &keys, &values, &ops)?;
    }

    #[test]
    fn prop_chain_map_matches_model_hashed(
        k0 in any::<u64>(),
        k1 in any::<u64>(),
        ops in proptest::collection::vec(map_op(64), 1..400),
    ) {
        let keys: Vec<u32> = (0..64).map(|k| k * 7919).collect();
        let values: Vec<u32> = (0..4).collect();
        let map = ChainMap::with_fns(
            |a: &u32, b: &u32| a == b,
            move |k: &u32, buckets: usize| {
                use core::hash::Hasher;
                let mut hasher = SipHasher::new_with_keys(k0, k1);
                hasher.write_u32(*k);
                (hasher.finish() % buckets as u64) as usize
            },
        );
        run_map_model(map, &keys, &values, &ops)?;
    }
}
