use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use crate::{Currency, LedgerError};

/// Canonical two-decimal rendering of a user-facing amount.
///
/// This string is the reference the codec matches candidates against: a minor
/// unit value is only accepted if decoding it re-renders to the same string.
#[must_use]
pub fn two_decimal_string(value: f64) -> String {
    format!("{value:.2}")
}

/// Converts a user-facing decimal amount into integer minor units.
///
/// Naive `value * 100` truncation introduces off-by-one cents because most
/// two-decimal amounts are not exactly representable in binary floating
/// point (`8.20 * 100 == 820.0000000000001`). Candidates are tried in a
/// fixed order and the first whose decoded form re-renders to the input's
/// canonical two-decimal string wins:
///
/// 1. `ceil(value * 100)`
/// 2. `trunc(value) * 100` (drop the fractional part, then scale)
/// 3. `floor(value * 100)`
///
/// When no candidate matches, the floored value is kept.
#[must_use]
pub fn encode_to_minor_units(value: f64) -> i64 {
    let canonical = two_decimal_string(value);

    let ceiled = (value * 100.0).ceil() as i64;
    let scaled = (value.trunc() as i64) * 100;
    let floored = (value * 100.0).floor() as i64;

    for candidate in [ceiled, scaled, floored] {
        if two_decimal_string(decode_from_minor_units(Some(candidate))) == canonical {
            return candidate;
        }
    }
    floored
}

/// Converts integer minor units back to a decimal amount.
///
/// A missing stored value decodes to zero.
#[must_use]
pub fn decode_from_minor_units(value: Option<i64>) -> f64 {
    value.unwrap_or(0) as f64 / 100.0
}

/// Signed money amount represented as **integer minor units** (cents).
///
/// Use this type for **all** monetary values in the engine (entry amounts,
/// balances) to avoid floating-point drift.
///
/// The value is signed:
/// - positive = incoming revenue
/// - negative = outgoing expense
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(-12_34);
/// assert_eq!(amount.minor_units(), -1234);
/// assert_eq!(amount.to_string(), "-12.34");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// Encodes a user-facing decimal through the minor-unit codec.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self(encode_to_minor_units(value))
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Decodes back to a user-facing decimal.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        decode_from_minor_units(Some(self.0))
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive (revenue).
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative (expense).
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Renders the amount with a currency symbol, e.g. `-10.50€` or `$3.00`.
    #[must_use]
    pub fn display_in(self, currency: Currency) -> String {
        match currency {
            Currency::Eur => format!("{self}{}", currency.symbol()),
            Currency::Usd => {
                if self.0 < 0 {
                    format!("-{}{}", currency.symbol(), -self)
                } else {
                    format!("{}{self}", currency.symbol())
                }
            }
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let major = abs / 100;
        let minor = abs % 100;
        write!(f, "{sign}{major}.{minor:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl FromStr for Money {
    type Err = LedgerError;

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading
    /// `+`/`-`. Rejects more than two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || LedgerError::InvalidAmount("empty amount".to_string());
        let invalid = || LedgerError::InvalidAmount("invalid amount".to_string());
        let overflow = || LedgerError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (-1i64, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (1i64, stripped)
        } else {
            (1i64, trimmed)
        };

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(empty());
        }

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let major_str = parts.next().ok_or_else(invalid)?;
        let minor_str = parts.next();

        if parts.next().is_some() {
            return Err(invalid());
        }

        if major_str.is_empty() || !major_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let major: i64 = major_str.parse().map_err(|_| invalid())?;

        let minor: i64 = match minor_str {
            None => 0,
            Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                match frac.len() {
                    0 => 0,
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    2 => frac.parse::<i64>().map_err(|_| invalid())?,
                    _ => return Err(LedgerError::InvalidAmount("too many decimals".to_string())),
                }
            }
        };

        let total = major
            .checked_mul(100)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(overflow)?;

        let signed = if sign < 0 {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        Ok(Money(signed))
    }
}
