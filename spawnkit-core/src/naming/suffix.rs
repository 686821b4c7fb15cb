//! Per-(parent, role) id suffixes.
//!
//! The numeric space `01`..`99` is used first, then the overflow space
//! `A1`..`Z9`. After `Z9` the pair is exhausted; the space never wraps.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Highest numeric suffix before the overflow space kicks in.
pub const MAX_NUMERIC: u8 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdSuffix {
    /// `01`..`99`
    Numeric(u8),
    /// `A1`..`Z9`; `letter` is an ASCII uppercase byte.
    Overflow { letter: u8, digit: u8 },
}

impl IdSuffix {
    /// Parse a suffix string. Only the two canonical shapes are accepted so that
    /// parse followed by display is the identity.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 || !bytes[1].is_ascii_digit() {
            return None;
        }
        let digit = bytes[1] - b'0';
        match bytes[0] {
            b'0'..=b'9' => {
                let n = (bytes[0] - b'0') * 10 + digit;
                (n > 0).then_some(IdSuffix::Numeric(n))
            }
            letter @ b'A'..=b'Z' => Some(IdSuffix::Overflow { letter, digit }),
            _ => None,
        }
    }

    /// Seed a suffix from a legacy version number (`-v7` → `07`).
    pub fn from_number(n: u32) -> Option<Self> {
        u8::try_from(n)
            .ok()
            .filter(|n| (1..=MAX_NUMERIC).contains(n))
            .map(IdSuffix::Numeric)
    }

    pub fn is_overflow(&self) -> bool {
        matches!(self, IdSuffix::Overflow { .. })
    }
}

impl fmt::Display for IdSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdSuffix::Numeric(n) => write!(f, "{:02}", n),
            IdSuffix::Overflow { letter, digit } => write!(f, "{}{}", *letter as char, digit),
        }
    }
}

impl Serialize for IdSuffix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IdSuffix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        IdSuffix::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid id suffix: {s}")))
    }
}

/// Compute the successor of the suffixes already in use.
///
/// Returns `None` once `Z9` is taken and the numeric space is full.
pub fn next_suffix<I>(in_use: I) -> Option<IdSuffix>
where
    I: IntoIterator<Item = IdSuffix>,
{
    let mut max_numeric = 0u8;
    let mut max_overflow: Option<(u8, u8)> = None;

    for suffix in in_use {
        match suffix {
            IdSuffix::Numeric(n) => max_numeric = max_numeric.max(n),
            IdSuffix::Overflow { letter, digit } => {
                max_overflow = max_overflow.max(Some((letter, digit)));
            }
        }
    }

    if max_numeric < MAX_NUMERIC {
        return Some(IdSuffix::Numeric(max_numeric + 1));
    }

    match max_overflow {
        None => Some(IdSuffix::Overflow { letter: b'A', digit: 1 }),
        Some((letter, digit)) if digit < 9 => Some(IdSuffix::Overflow {
            letter,
            digit: digit + 1,
        }),
        Some((letter, _)) if letter < b'Z' => Some(IdSuffix::Overflow {
            letter: letter + 1,
            digit: 1,
        }),
        Some(_) => None,
    }
}
