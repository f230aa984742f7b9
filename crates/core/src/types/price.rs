//! Decimal USD amounts.
//!
//! Prices are exact decimals (never floats) and are rounded to cents only
//! when a final amount is produced, e.g. a tax line on an order.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,

    /// The amount does not fit in a decimal.
    #[error("price is out of range")]
    Overflow,
}

/// A non-negative amount in US dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Multiply by a unit quantity, or `None` on overflow.
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Add two prices, or `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Sum prices, or `None` if any partial sum overflows.
    #[must_use]
    pub fn checked_sum(prices: impl IntoIterator<Item = Self>) -> Option<Self> {
        prices
            .into_iter()
            .try_fold(Self::ZERO, |acc, p| acc.checked_add(p))
    }

    /// Apply a rate (e.g. `0.07` for 7%) and round half-up to cents.
    /// `None` on overflow.
    #[must_use]
    pub fn checked_apply_rate(self, rate: Decimal) -> Option<Self> {
        self.0.checked_mul(rate).map(|amount| Self(round_cents(amount)))
    }

    /// Round half-up to cents.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self(round_cents(self.0))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
