//! Position functions for the two tables, plus the prime and divisor
//! helpers used when the tables are rebuilt.

use rand::Rng;

/// Upper bound (exclusive) of the raw value a rehash divisor is drawn from
/// before it is rounded up to a prime.
pub(crate) const DIVISOR_SPAN: i64 = 1 << 16;

/// Which of the two tables a slot belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Side {
    First,
    Second,
}

impl Side {
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }

    #[inline]
    pub(crate) fn other(self) -> Side {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }
}

// SplitMix64 finalizer constants.
const MIX_MUL_1: u64 = 0xbf58476d1ce4e5b9;
const MIX_MUL_2: u64 = 0x94d049bb133111eb;

/// Spreads a hasher's output over all 64 bits.
///
/// Position functions divide the hash before reducing it, which discards
/// low bits. Hashers that return small integers (identity hashes of
/// integer keys) would otherwise collapse to slot 0 in both tables once the
/// divisors grow. The mix is a bijection, so distinct hashes stay distinct.
#[inline]
pub(crate) fn mix(hash: u64) -> u64 {
    let mut x = hash;
    x ^= x >> 30;
    x = x.wrapping_mul(MIX_MUL_1);
    x ^= x >> 27;
    x = x.wrapping_mul(MIX_MUL_2);
    x ^ (x >> 31)
}

/// Maps a base hash to a slot index: truncating division by `divisor`,
/// then reduction into `[0, len)`.
#[inline]
pub(crate) fn position(hash: u64, divisor: i64, len: usize) -> usize {
    debug_assert!(divisor != 0 && len > 0);
    (hash as i64).wrapping_div(divisor).rem_euclid(len as i64) as usize
}

pub(crate) fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut i = 3;
    while i <= n / i {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

/// Smallest prime `>= n`.
pub(crate) fn next_prime(n: usize) -> usize {
    if n <= 2 {
        return 2;
    }
    let mut c = n | 1;
    while !is_prime(c) {
        c += 2;
    }
    c
}

/// Draws a fresh pair of divisors. The pair never repeats a value so the
/// two position functions stay distinct even at equal table lengths.
pub(crate) fn draw_divisors<R: Rng>(rng: &mut R) -> [i64; 2] {
    let mut draw = || next_prime(rng.gen_range(1..DIVISOR_SPAN) as usize) as i64;
    let first = draw();
    loop {
        let second = draw();
        if second != first {
            return [first, second];
        }
    }
}
