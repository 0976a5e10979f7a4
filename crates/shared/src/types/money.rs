//! Money type for whole-unit ledger amounts.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Ledgers keep a single currency without sub-units, so every amount is a
//! non-negative `rust_decimal::Decimal` with scale 0.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when constructing or combining `Money` values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The amount is negative.
    #[error("Amount cannot be negative: {0}")]
    Negative(Decimal),

    /// The amount carries a fractional part.
    #[error("Amount must be a whole number of currency units: {0}")]
    Fractional(Decimal),

    /// Subtracting would produce a negative amount.
    #[error("Cannot subtract {subtrahend} from {minuend}")]
    NegativeResult {
        /// The amount being subtracted from.
        minuend: Decimal,
        /// The amount being subtracted.
        subtrahend: Decimal,
    },

    /// The result exceeds the representable range.
    #[error("Amount overflow")]
    Overflow,
}

/// A non-negative whole-unit monetary amount in the ledger's currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero units.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a `Money` from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative or has a fractional part.
    pub fn of(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        if !amount.fract().is_zero() {
            return Err(MoneyError::Fractional(amount));
        }
        Ok(Self(amount.trunc().normalize()))
    }

    /// Creates a `Money` from an integer number of units.
    ///
    /// # Errors
    ///
    /// Returns an error if `units` is negative.
    pub fn won(units: i64) -> Result<Self, MoneyError> {
        if units < 0 {
            return Err(MoneyError::Negative(Decimal::from(units)));
        }
        Ok(Self(Decimal::from(units)))
    }

    /// Creates a zero amount.
    #[must_use]
    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// Returns the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Adds two amounts.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the sum is not representable.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Subtracts `other` from this amount.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::NegativeResult` if `other` is larger than `self`.
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyError> {
        if other.0 > self.0 {
            return Err(MoneyError::NegativeResult {
                minuend: self.0,
                subtrahend: other.0,
            });
        }
        Ok(Self(self.0 - other.0))
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::of(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
