//! CuckooHashTable: public surface over `RawCuckoo` with a debug
//! reentrancy guard, iterators and a removal cursor.

use crate::config::CuckooConfig;
use crate::error::{ConfigError, EntryNotFound};
use crate::hashing::Side;
use crate::raw_cuckoo::RawCuckoo;
use crate::reentrancy::DebugReentrancy;
use crate::slot_table::{Entry, Slot};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::{Chain, FusedIterator};
use hashbrown::hash_map::DefaultHashBuilder;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A two-table cuckoo hash map.
///
/// Every key lives in one of two candidate slots, one per table, so
/// lookups and removals inspect at most two slots. Insertions that run into
/// a long eviction chain rebuild both tables at roughly twice the size
/// with new hash divisors drawn from `R`.
///
/// The map is single-threaded: it is `Send` but not `Sync`. Wrap it in a
/// `Mutex` to share it.
#[derive(Clone)]
pub struct CuckooHashTable<K, V, S = DefaultHashBuilder, R = StdRng> {
    raw: RawCuckoo<K, V, S, R>,
    reentrancy: DebugReentrancy,
}

impl<K, V> CuckooHashTable<K, V>
where
    K: Eq + Hash,
{
    /// Empty map with two length-3 tables and an OS-seeded rng.
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    /// Same as `new`, but rehash divisors come from a rng seeded with
    /// `seed`, so table growth is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_raw(RawCuckoo::with_default_config(
            DefaultHashBuilder::default(),
            StdRng::seed_from_u64(seed),
        ))
    }

    pub fn with_config(config: CuckooConfig) -> Result<Self, ConfigError> {
        Self::with_hasher_and_rng(
            config,
            DefaultHashBuilder::default(),
            StdRng::from_entropy(),
        )
    }
}

impl<K, V> Default for CuckooHashTable<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> CuckooHashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_raw(RawCuckoo::with_default_config(
            hasher,
            StdRng::from_entropy(),
        ))
    }
}

impl<K, V, S, R> CuckooHashTable<K, V, S, R> {
    fn from_raw(raw: RawCuckoo<K, V, S, R>) -> Self {
        Self {
            raw,
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// Number of live entries across both tables.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of slots across both tables.
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Slot counts of table 1 and table 2.
    pub fn table_lens(&self) -> (usize, usize) {
        self.raw.table_lens()
    }

    /// Current hash divisors of table 1 and table 2.
    pub fn divisors(&self) -> (i64, i64) {
        self.raw.divisors()
    }

    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    /// Number of table rebuilds since construction.
    pub fn rehash_count(&self) -> u64 {
        self.raw.rehash_count()
    }

    pub fn config(&self) -> &CuckooConfig {
        self.raw.config()
    }

    pub fn hasher(&self) -> &S {
        self.raw.hasher()
    }

    /// Marks every slot empty. Table lengths and divisors are kept.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Entries of table 1, then table 2, in slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self
                .raw
                .table(Side::First)
                .slots()
                .iter()
                .chain(self.raw.table(Side::Second).slots().iter()),
            remaining: self.len(),
        }
    }

    /// Like `iter`, with mutable access to values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let remaining = self.len();
        let [first, second] = self.raw.tables_mut();
        IterMut {
            slots: first
                .slots_mut()
                .iter_mut()
                .chain(second.slots_mut().iter_mut()),
            remaining,
        }
    }

    /// A cursor that walks entries in `iter` order and can remove the entry
    /// it last produced.
    pub fn cursor(&mut self) -> Cursor<'_, K, V, S, R> {
        Cursor {
            raw: &mut self.raw,
            side: Side::First,
            next_idx: 0,
            current: None,
        }
    }

    /// Keeps only the entries for which `f` returns `true`.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        for side in [Side::First, Side::Second] {
            let table = self.raw.table_mut(side);
            for idx in 0..table.len() {
                let keep = match table.slot_mut(idx).entry_mut() {
                    Some(e) => f(&e.key, &mut e.value),
                    None => continue,
                };
                if !keep {
                    table.bury(idx);
                }
            }
        }
    }
}

impl<K, V, S, R> CuckooHashTable<K, V, S, R>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.raw.locate(q).is_some()
    }

    /// Entry for `q`, or `EntryNotFound` when absent.
    pub fn get<Q>(&self, q: &Q) -> Result<&Entry<K, V>, EntryNotFound>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.raw.get(q).ok_or(EntryNotFound)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Result<&mut V, EntryNotFound>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.raw
            .get_mut(q)
            .map(|e| &mut e.value)
            .ok_or(EntryNotFound)
    }

    /// Returns `false` when the key was absent; nothing changes then.
    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.take(q).is_some()
    }

    /// Removes the key and returns the owned pair.
    pub fn take<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.raw.take(q).map(Entry::into_parts)
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        self.raw.assert_invariants();
    }
}

impl<K, V, S, R> CuckooHashTable<K, V, S, R>
where
    K: Eq + Hash,
    S: BuildHasher,
    R: Rng,
{
    /// Builds a map from explicit parts. Use a seeded `rng` to make rehash
    /// divisors reproducible.
    pub fn with_hasher_and_rng(
        config: CuckooConfig,
        hasher: S,
        rng: R,
    ) -> Result<Self, ConfigError> {
        Ok(Self::from_raw(RawCuckoo::new(config, hasher, rng)?))
    }

    /// Inserts `key` unless it is already present.
    ///
    /// Returns `false` (and drops `key`/`value`) on a duplicate; the stored
    /// value is left untouched. Otherwise returns `true`; the insertion may
    /// rebuild the tables any number of times before it lands.
    ///
    /// # Panics
    ///
    /// When `max_rehashes` consecutive rebuilds cannot place the entries,
    /// which only happens if `K: Hash` maps distinct keys to equal hashes
    /// far more often than chance.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let _g = self.reentrancy.enter();
        self.raw.insert(key, value)
    }
}

impl<K, V, S, R> fmt::Debug for CuckooHashTable<K, V, S, R>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|e| (&e.key, &e.value)))
            .finish()
    }
}

/// Map equality: same keys, equal values. Layout, divisors and hashers are
/// not compared.
impl<K, V, S, R> PartialEq for CuckooHashTable<K, V, S, R>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|e| other.get(&e.key).map_or(false, |o| o.value == e.value))
    }
}

impl<K, V, S, R> Eq for CuckooHashTable<K, V, S, R>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S, R> Extend<(K, V)> for CuckooHashTable<K, V, S, R>
where
    K: Eq + Hash,
    S: BuildHasher,
    R: Rng,
{
    /// Keys already present keep their current value.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for CuckooHashTable<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::new();
        m.extend(iter);
        m
    }
}

type SlotIter<'a, K, V> = core::slice::Iter<'a, Slot<K, V>>;
type SlotIterMut<'a, K, V> = core::slice::IterMut<'a, Slot<K, V>>;
type SlotIntoIter<K, V> = std::vec::IntoIter<Slot<K, V>>;

/// Iterator over entries in `CuckooHashTable`.
pub struct Iter<'a, K, V> {
    slots: Chain<SlotIter<'a, K, V>, SlotIter<'a, K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = &'a Entry<K, V>;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let e = self.slots.find_map(Slot::entry)?;
        self.remaining -= 1;
        Some(e)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over mutable entries in `CuckooHashTable`.
pub struct IterMut<'a, K, V> {
    slots: Chain<SlotIterMut<'a, K, V>, SlotIterMut<'a, K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let e = self.slots.find_map(Slot::entry_mut)?;
        self.remaining -= 1;
        Some((&e.key, &mut e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning iterator over the pairs of a `CuckooHashTable`.
pub struct IntoIter<K, V> {
    slots: Chain<SlotIntoIter<K, V>, SlotIntoIter<K, V>>,
    remaining: usize,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);
    fn next(&mut self) -> Option<Self::Item> {
        let e = self.slots.find_map(|s| match s {
            Slot::Occupied(e) => Some(e),
            _ => None,
        })?;
        self.remaining -= 1;
        Some(e.into_parts())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<'a, K, V, S, R> IntoIterator for &'a CuckooHashTable<K, V, S, R> {
    type Item = &'a Entry<K, V>;
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, R> IntoIterator for &'a mut CuckooHashTable<K, V, S, R> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S, R> IntoIterator for CuckooHashTable<K, V, S, R> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(self) -> Self::IntoIter {
        let remaining = self.len();
        let [first, second] = self.raw.into_tables();
        IntoIter {
            slots: first
                .into_slots()
                .into_iter()
                .chain(second.into_slots()),
            remaining,
        }
    }
}

/// Walks entries in `iter` order while holding the map mutably, so the
/// entry just produced can be removed without invalidating the walk.
///
/// Removal leaves a tombstone in place; no other slot moves.
pub struct Cursor<'a, K, V, S, R> {
    raw: &'a mut RawCuckoo<K, V, S, R>,
    side: Side,
    next_idx: usize,
    current: Option<(Side, usize)>,
}

impl<'a, K, V, S, R> Cursor<'a, K, V, S, R> {
    /// Advances to the next live entry.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Entry<K, V>> {
        loop {
            let len = self.raw.table(self.side).len();
            if self.next_idx >= len {
                match self.side {
                    Side::First => {
                        self.side = Side::Second;
                        self.next_idx = 0;
                        continue;
                    }
                    Side::Second => {
                        self.current = None;
                        return None;
                    }
                }
            }
            let idx = self.next_idx;
            self.next_idx += 1;
            if self.raw.table(self.side).slot(idx).is_occupied() {
                self.current = Some((self.side, idx));
                return self.raw.table(self.side).slot(idx).entry();
            }
        }
    }

    /// Removes the entry last returned by `next`. Returns `None` if there is
    /// none or it was already removed.
    pub fn remove_current(&mut self) -> Option<(K, V)> {
        let (side, idx) = self.current.take()?;
        self.raw.table_mut(side).bury(idx).map(Entry::into_parts)
    }
}
