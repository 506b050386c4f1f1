//! RawCuckoo: the structural layer. Two slot tables, their divisors, the
//! eviction loop and the rehash controller.
//!
//! Between public calls every live entry sits at exactly the index its
//! stored hash maps to under its table's current divisor and length.
//! During an eviction chain or a rehash that may be transiently false.

use crate::config::CuckooConfig;
use crate::error::ConfigError;
use crate::hashing::{draw_divisors, mix, next_prime, position, Side};
use crate::slot_table::{Entry, SlotTable};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::mem;
use rand::Rng;

#[derive(Clone)]
pub(crate) struct RawCuckoo<K, V, S, R> {
    tables: [SlotTable<K, V>; 2],
    divisors: [i64; 2],
    hasher: S,
    rng: R,
    config: CuckooConfig,
    rehashes: u64,
}

impl<K, V, S, R> RawCuckoo<K, V, S, R> {
    pub(crate) fn new(config: CuckooConfig, hasher: S, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, hasher, rng))
    }

    pub(crate) fn with_default_config(hasher: S, rng: R) -> Self {
        Self::build(CuckooConfig::default(), hasher, rng)
    }

    fn build(config: CuckooConfig, hasher: S, rng: R) -> Self {
        let len = next_prime(config.initial_len);
        Self {
            tables: [SlotTable::with_len(len), SlotTable::with_len(len)],
            divisors: [config.divisors.0, config.divisors.1],
            hasher,
            rng,
            config,
            rehashes: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.tables[0].live() + self.tables[1].live()
    }

    #[inline]
    pub(crate) fn table(&self, side: Side) -> &SlotTable<K, V> {
        &self.tables[side.index()]
    }

    #[inline]
    pub(crate) fn table_mut(&mut self, side: Side) -> &mut SlotTable<K, V> {
        &mut self.tables[side.index()]
    }

    pub(crate) fn tables_mut(&mut self) -> [&mut SlotTable<K, V>; 2] {
        let [first, second] = &mut self.tables;
        [first, second]
    }

    pub(crate) fn capacity(&self) -> usize {
        self.tables[0].len() + self.tables[1].len()
    }

    pub(crate) fn table_lens(&self) -> (usize, usize) {
        (self.tables[0].len(), self.tables[1].len())
    }

    pub(crate) fn divisors(&self) -> (i64, i64) {
        (self.divisors[0], self.divisors[1])
    }

    pub(crate) fn rehash_count(&self) -> u64 {
        self.rehashes
    }

    pub(crate) fn config(&self) -> &CuckooConfig {
        &self.config
    }

    pub(crate) fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Empties both tables. Lengths and divisors are kept.
    pub(crate) fn clear(&mut self) {
        for t in &mut self.tables {
            t.clear();
        }
    }

    pub(crate) fn into_tables(self) -> [SlotTable<K, V>; 2] {
        self.tables
    }

    #[inline]
    fn slot_index(&self, side: Side, hash: u64) -> usize {
        position(
            hash,
            self.divisors[side.index()],
            self.tables[side.index()].len(),
        )
    }
}

impl<K, V, S, R> RawCuckoo<K, V, S, R>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Base hash of a key: the hasher's output, finalized with `mix`.
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        mix(self.hasher.hash_one(q))
    }

    /// Table 1 first, then table 2. At most two equality checks.
    pub(crate) fn locate<Q>(&self, q: &Q) -> Option<(Side, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.locate_hashed(hash, q)
    }

    fn locate_hashed<Q>(&self, hash: u64, q: &Q) -> Option<(Side, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        [Side::First, Side::Second].into_iter().find_map(|side| {
            let idx = self.slot_index(side, hash);
            self.table(side)
                .slot(idx)
                .entry()
                .filter(|e| e.hash == hash && e.key.borrow() == q)
                .map(|_| (side, idx))
        })
    }

    pub(crate) fn get<Q>(&self, q: &Q) -> Option<&Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let (side, idx) = self.locate(q)?;
        self.table(side).slot(idx).entry()
    }

    pub(crate) fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let (side, idx) = self.locate(q)?;
        self.table_mut(side).slot_mut(idx).entry_mut()
    }

    /// Tombstones the key's slot and returns its entry.
    pub(crate) fn take<Q>(&mut self, q: &Q) -> Option<Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let (side, idx) = self.locate(q)?;
        self.table_mut(side).bury(idx)
    }

    /// Checks the structural invariants. Test-only.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        use crate::hashing::is_prime;
        for side in [Side::First, Side::Second] {
            let t = self.table(side);
            assert!(is_prime(t.len()), "table length {} is not prime", t.len());
            let occupied = t.slots().iter().filter(|s| s.is_occupied()).count();
            assert_eq!(t.live(), occupied, "live count drifted on {:?}", side);
            for (idx, slot) in t.slots().iter().enumerate() {
                if let Some(e) = slot.entry() {
                    assert_eq!(e.hash, self.make_hash(&e.key), "stale stored hash");
                    assert_eq!(
                        self.slot_index(side, e.hash),
                        idx,
                        "entry misplaced on {:?}",
                        side
                    );
                    assert_eq!(self.locate(&e.key), Some((side, idx)));
                }
            }
        }
    }
}

impl<K, V, S, R> RawCuckoo<K, V, S, R>
where
    K: Eq + Hash,
    S: BuildHasher,
    R: Rng,
{
    /// Returns `false` without touching the map when the key is present.
    /// Otherwise the insertion always lands, rehashing as often as needed.
    pub(crate) fn insert(&mut self, key: K, value: V) -> bool {
        let hash = self.make_hash(&key);
        if self.locate_hashed(hash, &key).is_some() {
            return false;
        }
        if let Err(homeless) = self.displace(Entry::new(key, value, hash)) {
            self.rehash(homeless);
        }
        true
    }

    /// Eviction loop. Starts in table 1 and alternates, swapping the entry in
    /// hand with each occupant it lands on. After `max_displacements`
    /// placements without finding a vacant slot the entry currently in hand
    /// is returned; every other entry is still stored.
    fn displace(&mut self, mut entry: Entry<K, V>) -> Result<(), Entry<K, V>> {
        let mut side = Side::First;
        for _ in 0..self.config.max_displacements {
            let idx = self.slot_index(side, entry.hash);
            match self.table_mut(side).place(idx, entry) {
                None => return Ok(()),
                Some(evicted) => {
                    entry = evicted;
                    side = side.other();
                }
            }
        }
        log::trace!(
            "eviction chain exhausted after {} displacements (len={}, tables={:?})",
            self.config.max_displacements,
            self.len(),
            self.table_lens()
        );
        Err(entry)
    }

    /// Rebuilds both tables with fresh divisors and roughly twice the
    /// length, then places every live entry plus `homeless` again. Repeats
    /// until everything fits.
    ///
    /// Panics after `max_rehashes` rounds: at that point the key hashes
    /// cannot tell the entries apart.
    fn rehash(&mut self, homeless: Entry<K, V>) {
        let mut pending = vec![homeless];
        for round in 1..=self.config.max_rehashes {
            self.rebuild(&mut pending);
            log::debug!(
                "rehash round {}: tables={:?} divisors={:?} pending={}",
                round,
                self.table_lens(),
                self.divisors(),
                pending.len()
            );
            if self.place_all(&mut pending) {
                return;
            }
        }
        panic!(
            "cuckoo table could not place {} entries after {} rehash rounds; \
             the key hash is not separating keys",
            pending.len() + self.len(),
            self.config.max_rehashes
        );
    }

    /// Swaps in larger empty tables and new divisors; moves every live entry
    /// of the old tables into `pending`. Tombstones are dropped here.
    fn rebuild(&mut self, pending: &mut Vec<Entry<K, V>>) {
        self.divisors = draw_divisors(&mut self.rng);
        let grown = [
            SlotTable::with_len(next_prime(self.tables[0].len() * 2)),
            SlotTable::with_len(next_prime(self.tables[1].len() * 2)),
        ];
        let old = mem::replace(&mut self.tables, grown);
        for t in old {
            pending.extend(t.into_entries());
        }
        self.rehashes += 1;
    }

    /// Places entries until `pending` is empty (`true`) or one chain
    /// exhausts (`false`, the homeless entry is back in `pending`).
    fn place_all(&mut self, pending: &mut Vec<Entry<K, V>>) -> bool {
        while let Some(entry) = pending.pop() {
            if let Err(homeless) = self.displace(entry) {
                pending.push(homeless);
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot_table::Slot;
    use core::hash::{BuildHasherDefault, Hasher};
    use hashbrown::hash_map::DefaultHashBuilder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    /// Hashes a `u64` key to itself, so a key's slots follow from `mix(key)`
    /// alone.
    #[derive(Default)]
    struct IdentityHasher(u64);
    impl Hasher for IdentityHasher {
        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = (self.0 << 8) | b as u64;
            }
        }
        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }
    type Identity = BuildHasherDefault<IdentityHasher>;

    #[derive(Default)]
    struct ConstHasher;
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        }
    }

    fn identity_map() -> RawCuckoo<u64, &'static str, Identity, StdRng> {
        RawCuckoo::new(
            CuckooConfig::default(),
            Identity::default(),
            StdRng::seed_from_u64(1),
        )
        .unwrap()
    }

    fn seeded_map(seed: u64) -> RawCuckoo<u64, u64, DefaultHashBuilder, StdRng> {
        RawCuckoo::new(
            CuckooConfig::default(),
            DefaultHashBuilder::default(),
            StdRng::seed_from_u64(seed),
        )
        .unwrap()
    }

    fn stored_keys<V, S, R>(m: &RawCuckoo<u64, V, S, R>) -> BTreeSet<u64> {
        [Side::First, Side::Second]
            .into_iter()
            .flat_map(|side| m.table(side).slots().iter())
            .filter_map(|s| s.entry().map(|e| e.key))
            .collect()
    }

    #[test]
    fn fresh_map_has_two_len_three_tables() {
        let m = identity_map();
        assert_eq!(m.table_lens(), (3, 3));
        assert_eq!(m.divisors(), (1, 11));
        assert_eq!(m.len(), 0);
        assert_eq!(m.rehash_count(), 0);
    }

    #[test]
    fn initial_len_is_rounded_to_a_prime() {
        let m: RawCuckoo<u64, u64, Identity, StdRng> = RawCuckoo::new(
            CuckooConfig::default().with_initial_len(8),
            Identity::default(),
            StdRng::seed_from_u64(0),
        )
        .unwrap();
        assert_eq!(m.table_lens(), (11, 11));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let r: Result<RawCuckoo<u64, u64, Identity, StdRng>, _> = RawCuckoo::new(
            CuckooConfig::default().with_divisors(0, 3),
            Identity::default(),
            StdRng::seed_from_u64(0),
        );
        assert!(matches!(r, Err(ConfigError::ZeroDivisor)));
    }

    /// Invariant: a new key lands in table 1; when its slot is taken the
    /// occupant moves to its table 2 position.
    #[test]
    fn collision_evicts_occupant_into_second_table() {
        let mut m = identity_map();
        // Lengths 3/3, divisors 1/11: 6 maps to slots (0, 2), 2 to (0, 1).
        assert!(m.insert(6, "a"));
        assert_eq!(m.locate(&6), Some((Side::First, 0)));

        // 2 collides in table 1 and evicts 6.
        assert!(m.insert(2, "b"));
        assert_eq!(m.locate(&2), Some((Side::First, 0)));
        assert_eq!(m.locate(&6), Some((Side::Second, 2)));
        assert_eq!(m.table(Side::First).live(), 1);
        assert_eq!(m.table(Side::Second).live(), 1);
        assert_eq!(m.rehash_count(), 0);
        m.assert_invariants();
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let mut m = identity_map();
        assert!(m.insert(5, "first"));
        assert!(!m.insert(5, "second"));
        assert_eq!(m.len(), 1);
        assert_eq!(m.get(&5).map(|e| e.value), Some("first"));
    }

    /// Invariant: an exhausted chain hands back the entry in hand and keeps
    /// every other entry stored.
    #[test]
    fn exhausted_chain_returns_the_entry_in_hand() {
        let mut m = identity_map();
        // 1, 4 and 15 all map to slots (1, 1), so only two of them fit.
        assert!(m.insert(1, "a"));
        assert!(m.insert(4, "b"));
        let hash = m.make_hash(&15u64);
        let homeless = m
            .displace(Entry::new(15, "c", hash))
            .expect_err("third key cannot fit");

        let mut all = stored_keys(&m);
        assert_eq!(all.len(), 2);
        assert!(!all.contains(&homeless.key));
        all.insert(homeless.key);
        assert_eq!(all, BTreeSet::from([1, 4, 15]));
        assert_eq!(m.len(), 2);
        m.assert_invariants();
    }

    #[test]
    fn take_tombstones_and_reports_absence() {
        let mut m = identity_map();
        m.insert(6, "a");
        m.insert(2, "b");
        let e = m.take(&6).expect("present");
        assert_eq!(e.into_parts(), (6, "a"));
        assert!(matches!(m.table(Side::Second).slot(2), Slot::Tombstone));
        assert_eq!(m.len(), 1);
        assert!(m.take(&6).is_none());
        assert!(m.take(&99).is_none());
        assert_eq!(m.len(), 1);
        m.assert_invariants();
    }

    /// Invariant: a key whose table 1 slot holds a tombstone is still found
    /// in table 2, and a later insert reuses the tombstone.
    #[test]
    fn lookup_skips_tombstone_and_insert_reuses_it() {
        let mut m = identity_map();
        m.insert(6, "a");
        m.insert(2, "b"); // 6 now in table 2
        assert!(m.take(&2).is_some());
        assert!(matches!(m.table(Side::First).slot(0), Slot::Tombstone));
        assert_eq!(m.locate(&6), Some((Side::Second, 2)));

        assert!(m.insert(8, "c")); // table 1 slot 0
        assert_eq!(m.locate(&8), Some((Side::First, 0)));
        assert_eq!(m.table(Side::First).live(), 1);
        m.assert_invariants();
    }

    /// Invariant: an identity hash of small integers survives rehashing;
    /// large drawn divisors do not collapse the keys onto one slot.
    #[test]
    fn identity_hashed_small_keys_survive_rehash() {
        for seed in 0..20 {
            let mut m: RawCuckoo<u64, u64, Identity, StdRng> = RawCuckoo::new(
                CuckooConfig::default(),
                Identity::default(),
                StdRng::seed_from_u64(seed),
            )
            .unwrap();
            for k in 0..20u64 {
                assert!(m.insert(k, k));
            }
            assert_eq!(m.len(), 20);
            assert!(m.rehash_count() >= 1);
            for k in 0..20u64 {
                assert_eq!(m.get(&k).map(|e| e.value), Some(k));
            }
            m.assert_invariants();
        }
    }

    #[test]
    fn twenty_keys_force_a_rehash_and_survive_it() {
        let mut m = seeded_map(3);
        for k in 0..20u64 {
            assert!(m.insert(k, k * 10));
            m.assert_invariants();
        }
        assert_eq!(m.len(), 20);
        assert!(m.rehash_count() >= 1);
        assert!(m.capacity() >= 20);
        for k in 0..20u64 {
            assert_eq!(m.get(&k).map(|e| e.value), Some(k * 10));
        }
    }

    /// Invariant: rehash carries live entries only; tombstones disappear and
    /// removed keys stay removed.
    #[test]
    fn rehash_drops_tombstones() {
        let mut m = seeded_map(11);
        for k in 0..5u64 {
            m.insert(k, k);
        }
        m.take(&1);
        m.take(&3);
        let before = m.rehash_count();
        let mut k = 100;
        while m.rehash_count() == before {
            m.insert(k, k);
            k += 1;
        }
        let tombstones = [Side::First, Side::Second]
            .into_iter()
            .flat_map(|side| m.table(side).slots().iter())
            .filter(|s| matches!(s, Slot::Tombstone))
            .count();
        assert_eq!(tombstones, 0);
        assert!(m.get(&1).is_none());
        assert!(m.get(&3).is_none());
        for k in [0u64, 2, 4] {
            assert!(m.get(&k).is_some());
        }
        m.assert_invariants();
    }

    #[test]
    fn rehash_grows_to_next_prime_of_double() {
        let mut m = seeded_map(5);
        let mut k = 0;
        while m.rehash_count() == 0 {
            m.insert(k, k);
            k += 1;
        }
        let (a, b) = m.table_lens();
        // One round takes 3 -> 7; a second round in the same insert -> 17.
        assert!([7, 17, 37].contains(&a));
        assert_eq!(a, b);
        let (d1, d2) = m.divisors();
        assert_ne!(d1, d2);
    }

    #[test]
    fn same_seed_gives_same_layout() {
        let mut a = seeded_map(9);
        let mut b: RawCuckoo<u64, u64, DefaultHashBuilder, StdRng> = RawCuckoo::new(
            *a.config(),
            a.hasher().clone(),
            StdRng::seed_from_u64(9),
        )
        .unwrap();
        for k in 0..50u64 {
            a.insert(k, k);
            b.insert(k, k);
        }
        assert_eq!(a.table_lens(), b.table_lens());
        assert_eq!(a.divisors(), b.divisors());
        for k in 0..50u64 {
            assert_eq!(a.locate(&k), b.locate(&k));
        }
    }

    #[test]
    fn clear_keeps_lengths_and_divisors() {
        let mut m = seeded_map(2);
        for k in 0..30u64 {
            m.insert(k, k);
        }
        let lens = m.table_lens();
        let divs = m.divisors();
        m.clear();
        assert_eq!(m.len(), 0);
        assert_eq!(m.table_lens(), lens);
        assert_eq!(m.divisors(), divs);
        assert!(m.get(&0).is_none());
        assert!(m.insert(0, 1));
        m.assert_invariants();
    }

    #[test]
    #[should_panic(expected = "rehash rounds")]
    fn degenerate_hash_fails_fast() {
        let mut m: RawCuckoo<u64, u64, BuildHasherDefault<ConstHasher>, StdRng> = RawCuckoo::new(
            CuckooConfig::default().with_max_rehashes(3),
            BuildHasherDefault::default(),
            StdRng::seed_from_u64(0),
        )
        .unwrap();
        // Every key maps to slot 0 in both tables; two fit, the third never
        // will.
        m.insert(1, 1);
        m.insert(2, 2);
        m.insert(3, 3);
    }
}
