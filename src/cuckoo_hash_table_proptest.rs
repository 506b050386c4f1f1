#![cfg(test)]

// Property tests for CuckooHashTable kept inside the crate so they can
// check structural invariants after every operation.

use crate::config::CuckooConfig;
use crate::cuckoo_hash_table::CuckooHashTable;
use crate::error::EntryNotFound;
use hashbrown::hash_map::DefaultHashBuilder;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    CursorRemove(usize),
    Retain(i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=40).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => idx.clone().prop_map(OpI::CursorRemove),
            1 => (2i32..5).prop_map(OpI::Retain),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_state_machine(
    mut sut: CuckooHashTable<Key, i32, DefaultHashBuilder, StdRng>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                let inserted = sut.insert(k.clone(), v);
                prop_assert_eq!(inserted, !already, "insert succeeds iff key absent");
                model.entry(k).or_insert(v);
            }
            OpI::Remove(i) => {
                let k = key_from(&pool, i);
                let removed = sut.remove(&k);
                prop_assert_eq!(removed, model.remove(&k).is_some());
                prop_assert!(!sut.contains_key(&k));
            }
            OpI::Get(i) => {
                let k = key_from(&pool, i);
                match (sut.get(&k), model.get(&k)) {
                    (Ok(e), Some(mv)) => {
                        prop_assert_eq!(e.key(), &k);
                        prop_assert_eq!(e.value(), mv);
                    }
                    (Err(EntryNotFound), None) => {}
                    (got, want) => {
                        prop_assert!(false, "get mismatch: {:?} vs {:?}", got, want);
                    }
                }
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                match (sut.get_mut(&k), model.get_mut(&k)) {
                    (Ok(v), Some(mv)) => {
                        *v = v.saturating_add(d);
                        *mv = mv.saturating_add(d);
                    }
                    (Err(_), None) => {}
                    _ => prop_assert!(false, "get_mut presence mismatch"),
                }
            }
            OpI::CursorRemove(i) => {
                // Remove one key through the cursor while walking.
                let k = key_from(&pool, i);
                let mut c = sut.cursor();
                let mut hit = None;
                while let Some(e) = c.next() {
                    if e.key() == &k {
                        hit = c.remove_current();
                        break;
                    }
                }
                prop_assert_eq!(hit.map(|(_, v)| v), model.remove(&k));
            }
            OpI::Retain(m) => {
                sut.retain(|_, v| v.rem_euclid(m) != 0);
                model.retain(|_, v| v.rem_euclid(m) != 0);
            }
            OpI::Iterate => {
                let s_keys: Vec<_> = sut.iter().map(|e| e.key().clone()).collect();
                let unique: BTreeSet<_> = s_keys.iter().cloned().collect();
                prop_assert_eq!(s_keys.len(), unique.len(), "iteration repeated a key");
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(unique, m_keys);
            }
            OpI::Clear => {
                let cap = sut.capacity();
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.capacity(), cap);
            }
        }

        // Post-conditions after each op
        sut.assert_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.iter().count(), model.len());
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Duplicate keys are rejected and keep their first value.
// - `get`/`contains_key` parity with the model for present/absent keys.
// - `remove` and cursor removal report presence and make the key absent.
// - `iter` yields each live entry exactly once.
// - Live counts, slot positions and `len` stay exact after each op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(seed in any::<u64>(), (pool, ops) in arb_scenario()) {
        let sut = CuckooHashTable::with_hasher_and_rng(
            CuckooConfig::default(),
            DefaultHashBuilder::default(),
            StdRng::seed_from_u64(seed),
        ).unwrap();
        run_state_machine(sut, pool, ops)?;
    }
}

// Property: Same state-machine invariants with very short eviction chains and
// tiny starting tables, so nearly every collision triggers a rehash and
// rehash rounds regularly fail and restart.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_under_frequent_rehash(
        seed in any::<u64>(),
        max_displacements in 2usize..=4,
        (pool, ops) in arb_scenario(),
    ) {
        let config = CuckooConfig::default()
            .with_initial_len(2)
            .with_max_displacements(max_displacements)
            .with_max_rehashes(32);
        let sut = CuckooHashTable::with_hasher_and_rng(
            config,
            DefaultHashBuilder::default(),
            StdRng::seed_from_u64(seed),
        ).unwrap();
        run_state_machine(sut, pool, ops)?;
    }
}
