//! cuckoo-table: a single-threaded two-table cuckoo hash map with bounded
//! eviction chains and full rebuilds on overflow.
//!
//! ```
//! use cuckoo_table::CuckooHashTable;
//!
//! let mut m = CuckooHashTable::new();
//! assert!(m.insert("a", 1));
//! assert!(m.insert("b", 2));
//! assert!(!m.insert("a", 3)); // duplicate, ignored
//! assert_eq!(m.get(&"a").map(|e| *e.value()), Ok(1));
//! assert!(m.remove(&"b"));
//! assert!(!m.remove(&"b"));
//! assert!(m.get(&"b").is_err());
//! ```
//!
//! Internal Design:
//!
//! Summary
//! - Every key has one candidate slot in each of two tables. Lookup and
//!   removal inspect at most those two slots.
//! - Layers:
//!   - SlotTable<K, V>: a fixed-length array of `Empty | Occupied |
//!     Tombstone` slots with an exact live count.
//!   - RawCuckoo<K, V, S, R>: both tables, their divisors, the eviction
//!     loop and the rehash controller.
//!   - CuckooHashTable<K, V, S, R>: public API; adds a debug-only
//!     reentrancy guard, iterators and a removal cursor.
//!
//! Position functions
//! - A key's base hash is the `S: BuildHasher` output passed through a
//!   SplitMix64 finalizer, and is stored with the entry. Table `i` maps it
//!   to `(hash as i64 / divisor_i) mod len_i`, normalized into `[0, len_i)`.
//! - Hashers that return small integers (identity hashes of integer keys)
//!   still spread across slots after division by a large divisor.
//! - Divisors start at 1 and 11 and are redrawn from `R: Rng` on every
//!   rehash. They only decorrelate the two tables; they need not be prime,
//!   although drawn ones are.
//!
//! Insertion
//! - Duplicates are rejected up front with a single lookup.
//! - The entry goes to table 1; an occupant found there is evicted to its
//!   table 2 slot, whose occupant goes back to table 1, and so on for at
//!   most `max_displacements` steps (16 by default).
//! - An exhausted chain returns the entry it was holding. The rehash
//!   controller then rebuilds both tables at `next_prime(2 * len)` with new
//!   divisors and places every live entry plus that one again. Nothing is
//!   dropped.
//! - A key type whose hash cannot separate keys would rehash forever; after
//!   `max_rehashes` rounds for one insertion the map panics instead.
//!
//! Removal
//! - Removal turns the slot into a tombstone. Tombstones are vacant for
//!   insertion and skipped by lookup and iteration; rehash discards them.
//!
//! Constraints
//! - Single-threaded: `Send`, not `Sync`. Share through a `Mutex`.
//! - `K: Hash` runs once per insertion and once per lookup; evictions and
//!   rehashes use the stored hash.
//! - Reentrancy: a `Hash`/`Eq` impl must not call back into the same map.
//!   Debug builds panic when it does.
//!
//! Notes and non-goals
//! - No shrinking; capacity only grows through rehash.
//! - The displacement bound is a fixed parameter, not a function of size.
//! - Iteration order is table 1 then table 2 in slot order, and changes
//!   across rehashes.

mod config;
mod cuckoo_hash_table;
mod cuckoo_hash_table_proptest;
mod error;
mod hashing;
mod raw_cuckoo;
mod reentrancy;
mod slot_table;

// Public surface
pub use config::{
    CuckooConfig, DEFAULT_DIVISORS, DEFAULT_INITIAL_LEN, DEFAULT_MAX_DISPLACEMENTS,
    DEFAULT_MAX_REHASHES,
};
pub use cuckoo_hash_table::{CuckooHashTable, Cursor, IntoIter, Iter, IterMut};
pub use error::{ConfigError, EntryNotFound};
pub use reentrancy::{DebugReentrancy, ReentrancyGuard};
pub use slot_table::Entry;
