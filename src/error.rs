//! Error types surfaced by `CuckooHashTable`.

/// Returned by `get`/`get_mut` when the key is not present.
///
/// Absence is only an error on these accessors; `insert`, `remove` and
/// `contains_key` report it through their boolean result instead.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("the requested entry does not exist")]
pub struct EntryNotFound;

/// Rejected `CuckooConfig` values.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("hash divisors must be non-zero")]
    ZeroDivisor,
    #[error("initial table length {len} is too small (minimum 2)")]
    TableTooSmall { len: usize },
    #[error("max_displacements must be at least 1")]
    ZeroDisplacements,
    #[error("max_rehashes must be at least 1")]
    ZeroRehashes,
}
