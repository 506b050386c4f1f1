//! Tunables for `CuckooHashTable`.

use crate::error::ConfigError;

/// Length of each table in a freshly created map.
pub const DEFAULT_INITIAL_LEN: usize = 3;

/// Evictions tried before an insertion is declared exhausted and the
/// tables are rebuilt.
pub const DEFAULT_MAX_DISPLACEMENTS: usize = 16;

/// Consecutive rebuilds tolerated for a single insertion before giving up.
pub const DEFAULT_MAX_REHASHES: u32 = 10;

/// Starting divisors for the first and second table.
pub const DEFAULT_DIVISORS: (i64, i64) = (1, 11);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CuckooConfig {
    /// Slots per table before the first rehash. Rounded up to a prime.
    pub initial_len: usize,
    /// Eviction chain bound. Kept as a plain parameter; it does not scale
    /// with the table length.
    pub max_displacements: usize,
    /// Rehash rounds allowed for one insertion. Exceeding it means the key
    /// hash cannot separate the entries and the map panics.
    pub max_rehashes: u32,
    /// Divisors applied to the base hash for table 1 and table 2 until the
    /// first rehash replaces them.
    pub divisors: (i64, i64),
}

impl Default for CuckooConfig {
    fn default() -> Self {
        Self {
            initial_len: DEFAULT_INITIAL_LEN,
            max_displacements: DEFAULT_MAX_DISPLACEMENTS,
            max_rehashes: DEFAULT_MAX_REHASHES,
            divisors: DEFAULT_DIVISORS,
        }
    }
}

impl CuckooConfig {
    pub fn with_initial_len(mut self, len: usize) -> Self {
        self.initial_len = len;
        self
    }

    pub fn with_max_displacements(mut self, n: usize) -> Self {
        self.max_displacements = n;
        self
    }

    pub fn with_max_rehashes(mut self, n: u32) -> Self {
        self.max_rehashes = n;
        self
    }

    pub fn with_divisors(mut self, first: i64, second: i64) -> Self {
        self.divisors = (first, second);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_len < 2 {
            return Err(ConfigError::TableTooSmall {
                len: self.initial_len,
            });
        }
        if self.divisors.0 == 0 || self.divisors.1 == 0 {
            return Err(ConfigError::ZeroDivisor);
        }
        if self.max_displacements == 0 {
            return Err(ConfigError::ZeroDisplacements);
        }
        if self.max_rehashes == 0 {
            return Err(ConfigError::ZeroRehashes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let c = CuckooConfig::default();
        assert_eq!(c.initial_len, 3);
        assert_eq!(c.max_displacements, 16);
        assert_eq!(c.divisors, (1, 11));
        assert_eq!(c.validate(), Ok(()));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let base = CuckooConfig::default();
        assert_eq!(
            base.with_initial_len(1).validate(),
            Err(ConfigError::TableTooSmall { len: 1 })
        );
        assert_eq!(
            base.with_divisors(0, 11).validate(),
            Err(ConfigError::ZeroDivisor)
        );
        assert_eq!(
            base.with_divisors(1, 0).validate(),
            Err(ConfigError::ZeroDivisor)
        );
        assert_eq!(
            base.with_max_displacements(0).validate(),
            Err(ConfigError::ZeroDisplacements)
        );
        assert_eq!(
            base.with_max_rehashes(0).validate(),
            Err(ConfigError::ZeroRehashes)
        );
    }

    #[test]
    fn negative_divisors_are_accepted() {
        let c = CuckooConfig::default().with_divisors(-7, 13);
        assert_eq!(c.validate(), Ok(()));
    }
}
