//! Arbitrary-precision memory cells.
//!
//! Every value a program touches (cells, operands, inputs, outputs and the
//! relative base) is a [`Word`]. Values that fit in an `i64` stay inline and
//! use machine arithmetic; a result that leaves that range is promoted to a
//! [`BigInt`], and is demoted again as soon as it fits.

use num_bigint::{BigInt, ParseBigIntError};
use num_traits::{Signed, ToPrimitive};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

/// Signed integer of unbounded range.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Word(Repr);

/// `Big` only ever holds values outside the `i64` range, so each value has a
/// single representation and the derived equality is exact.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Repr {
    Small(i64),
    Big(BigInt),
}

impl Word {
    pub const ZERO: Word = Word(Repr::Small(0));
    pub const ONE: Word = Word(Repr::Small(1));

    /// The value as an `i64`, if it fits.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self.0 {
            Repr::Small(v) => Some(v),
            Repr::Big(_) => None,
        }
    }

    /// The value as a memory address or instruction position, if it is one.
    #[inline]
    pub fn to_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|v| usize::try_from(v).ok())
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        matches!(self.0, Repr::Small(0))
    }

    pub fn is_negative(&self) -> bool {
        match &self.0 {
            Repr::Small(v) => *v < 0,
            Repr::Big(b) => b.is_negative(),
        }
    }

    pub fn to_bigint(&self) -> BigInt {
        match &self.0 {
            Repr::Small(v) => BigInt::from(*v),
            Repr::Big(b) => b.clone(),
        }
    }
}

impl Default for Word {
    fn default() -> Self {
        Word::ZERO
    }
}

impl From<i64> for Word {
    #[inline]
    fn from(value: i64) -> Self {
        Word(Repr::Small(value))
    }
}

impl From<i32> for Word {
    #[inline]
    fn from(value: i32) -> Self {
        Word(Repr::Small(i64::from(value)))
    }
}

impl From<bool> for Word {
    #[inline]
    fn from(value: bool) -> Self {
        Word(Repr::Small(i64::from(value)))
    }
}

impl From<BigInt> for Word {
    fn from(value: BigInt) -> Self {
        match value.to_i64() {
            Some(v) => Word(Repr::Small(v)),
            None => Word(Repr::Big(value)),
        }
    }
}

impl PartialEq<i64> for Word {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}

impl PartialEq<i32> for Word {
    fn eq(&self, other: &i32) -> bool {
        self.as_i64() == Some(i64::from(*other))
    }
}

impl Ord for Word {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (Repr::Small(a), Repr::Small(b)) => a.cmp(b),
            _ => self.to_bigint().cmp(&other.to_bigint()),
        }
    }
}

impl PartialOrd for Word {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for &Word {
    type Output = Word;

    #[inline]
    fn add(self, rhs: Self) -> Word {
        if let (Repr::Small(a), Repr::Small(b)) = (&self.0, &rhs.0) {
            if let Some(sum) = a.checked_add(*b) {
                return Word(Repr::Small(sum));
            }
        }
        Word::from(self.to_bigint() + rhs.to_bigint())
    }
}

impl Mul for &Word {
    type Output = Word;

    #[inline]
    fn mul(self, rhs: Self) -> Word {
        if let (Repr::Small(a), Repr::Small(b)) = (&self.0, &rhs.0) {
            if let Some(product) = a.checked_mul(*b) {
                return Word(Repr::Small(product));
            }
        }
        Word::from(self.to_bigint() * rhs.to_bigint())
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Small(v) => write!(f, "{v}"),
            Repr::Big(b) => write!(f, "{b}"),
        }
    }
}

impl FromStr for Word {
    type Err = ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<i64>() {
            Ok(v) => Ok(Word::from(v)),
            Err(_) => s.parse::<BigInt>().map(Word::from),
        }
    }
}

/// Converts machine integers into cells.
pub fn words(values: &[i64]) -> Vec<Word> {
    values.iter().copied().map(Word::from).collect()
}
