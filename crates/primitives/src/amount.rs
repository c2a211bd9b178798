//! Fixed-point ledger amounts.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fractional digits the ledger keeps for every asset.
pub const LEDGER_DECIMALS: u32 = 7;

/// Number of stroops in one whole unit.
pub const STROOPS_PER_UNIT: i64 = 10_i64.pow(LEDGER_DECIMALS);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must be a plain decimal number, got `{0}`")]
    Malformed(String),
    #[error("amount has {actual} fractional digits, at most {max} allowed")]
    TooPrecise { max: u32, actual: usize },
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount is too large")]
    Overflow,
}

/// An amount with 7 fractional digits, stored in stroops.
///
/// Transfer amounts are strictly positive. Only [`Amount::ZERO`] and
/// [`Amount::parse_non_negative`] produce zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Self = Self(0);

    /// Parse a positive decimal string with at most `max_decimals` fractional digits.
    ///
    /// Accepts `digits` or `digits.digits`; rejects signs, exponents, separators
    /// and surrounding whitespace.
    pub fn parse(value: &str, max_decimals: u32) -> Result<Self, AmountError> {
        Self::from_stroops(parse_stroops(value, max_decimals)?)
    }

    /// Like [`Amount::parse`], but zero is accepted.
    pub fn parse_non_negative(value: &str, max_decimals: u32) -> Result<Self, AmountError> {
        parse_stroops(value, max_decimals).map(Self)
    }

    pub const fn from_stroops(stroops: i64) -> Result<Self, AmountError> {
        if stroops <= 0 {
            return Err(AmountError::NotPositive);
        }
        Ok(Self(stroops))
    }

    pub const fn stroops(&self) -> i64 {
        self.0
    }
}

fn parse_stroops(value: &str, max_decimals: u32) -> Result<i64, AmountError> {
    if value.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty()
        || !digits_only(whole)
        || !digits_only(fraction)
        || (value.contains('.') && fraction.is_empty())
    {
        return Err(AmountError::Malformed(value.to_string()));
    }

    let max = max_decimals.min(LEDGER_DECIMALS);
    if fraction.len() > max as usize {
        return Err(AmountError::TooPrecise {
            max,
            actual: fraction.len(),
        });
    }

    let whole: i64 = whole.parse().map_err(|_| AmountError::Overflow)?;
    let mut fractional: i64 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().map_err(|_| AmountError::Overflow)?
    };
    for _ in fraction.len()..LEDGER_DECIMALS as usize {
        fractional *= 10;
    }

    whole
        .checked_mul(STROOPS_PER_UNIT)
        .and_then(|w| w.checked_add(fractional))
        .ok_or(AmountError::Overflow)
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, LEDGER_DECIMALS)
    }
}

/// Canonical form with exactly 7 fractional digits, e.g. `100.0000000`.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:07}",
            self.0 / STROOPS_PER_UNIT,
            self.0 % STROOPS_PER_UNIT
        )
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde helper for amounts that may be zero, such as reserve figures.
pub mod non_negative {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Amount, LEDGER_DECIMALS};

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        Amount::parse_non_negative(&s, LEDGER_DECIMALS).map_err(serde::de::Error::custom)
    }
}
