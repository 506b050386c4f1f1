//! SlotTable: one of the two fixed-length slot arrays.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::mem;

/// A live key/value pair stored in a slot.
///
/// The key's base hash is computed once on insertion and kept alongside it;
/// evictions and rehashes position the entry from the stored hash and never
/// call `K: Hash` again. Equality, hashing and `Debug` look at the key and
/// value only.
#[derive(Clone)]
pub struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for Entry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

impl<K: Eq, V: Eq> Eq for Entry<K, V> {}

impl<K: Hash, V: Hash> Hash for Entry<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.value.hash(state);
    }
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(key: K, value: V, hash: u64) -> Self {
        Self { key, value, hash }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub(crate) fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

/// Tombstones stay in place until the next rehash; they are never compacted
/// otherwise.
#[derive(Clone, Debug)]
pub(crate) enum Slot<K, V> {
    Empty,
    Occupied(Entry<K, V>),
    Tombstone,
}

impl<K, V> Slot<K, V> {
    #[inline]
    pub(crate) fn entry(&self) -> Option<&Entry<K, V>> {
        match self {
            Slot::Occupied(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn entry_mut(&mut self) -> Option<&mut Entry<K, V>> {
        match self {
            Slot::Occupied(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn is_occupied(&self) -> bool {
        matches!(self, Slot::Occupied(_))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct SlotTable<K, V> {
    slots: Vec<Slot<K, V>>,
    live: usize,
}

impl<K, V> SlotTable<K, V> {
    pub(crate) fn with_len(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || Slot::Empty);
        Self { slots, live: 0 }
    }

    /// Number of slots.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[inline]
    pub(crate) fn live(&self) -> usize {
        self.live
    }

    #[inline]
    pub(crate) fn slot(&self, idx: usize) -> &Slot<K, V> {
        &self.slots[idx]
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, idx: usize) -> &mut Slot<K, V> {
        &mut self.slots[idx]
    }

    pub(crate) fn slots(&self) -> &[Slot<K, V>] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Slot<K, V>] {
        &mut self.slots
    }

    /// Puts `entry` at `idx`. A vacant slot (empty or tombstone) takes it and
    /// the live count grows; an occupied slot swaps its occupant out and
    /// returns it.
    pub(crate) fn place(&mut self, idx: usize, entry: Entry<K, V>) -> Option<Entry<K, V>> {
        match &mut self.slots[idx] {
            Slot::Occupied(occupant) => Some(mem::replace(occupant, entry)),
            vacant => {
                *vacant = Slot::Occupied(entry);
                self.live += 1;
                None
            }
        }
    }

    /// Turns an occupied slot into a tombstone and hands back its entry.
    pub(crate) fn bury(&mut self, idx: usize) -> Option<Entry<K, V>> {
        let slot = &mut self.slots[idx];
        if !slot.is_occupied() {
            return None;
        }
        match mem::replace(slot, Slot::Tombstone) {
            Slot::Occupied(e) => {
                self.live -= 1;
                Some(e)
            }
            _ => unreachable!("slot checked occupied"),
        }
    }

    /// Empties every slot, keeping the length.
    pub(crate) fn clear(&mut self) {
        for s in &mut self.slots {
            *s = Slot::Empty;
        }
        self.live = 0;
    }

    /// Consumes the table, yielding live entries in slot order.
    pub(crate) fn into_entries(self) -> impl Iterator<Item = Entry<K, V>> {
        self.slots.into_iter().filter_map(|s| match s {
            Slot::Occupied(e) => Some(e),
            _ => None,
        })
    }

    pub(crate) fn into_slots(self) -> Vec<Slot<K, V>> {
        self.slots
    }
}
