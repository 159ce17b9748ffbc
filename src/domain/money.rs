//! Currency amounts and the catalog sentinels.
//!
//! Catalog numbers carry a sentinel alternative (`Free`, `Unlimited`,
//! `Never`). Persisted documents keep the sentinel as a plain string and
//! every other value as a JSON number.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Whole units of the server currency.
pub type Coins = i64;

/// Round half-to-even to a whole number of coins.
#[must_use]
pub fn round_coins(value: Decimal) -> Coins {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .unwrap_or(0)
}

/// `unit × quantity`, or `None` when it does not fit in [`Coins`].
#[must_use]
pub fn checked_total(unit: Coins, quantity: u64) -> Option<Coins> {
    Coins::try_from(quantity)
        .ok()
        .and_then(|quantity| unit.checked_mul(quantity))
}

/// Raw persisted form shared by the sentinel types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Raw {
    Number(u64),
    Text(String),
}

/// Price of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Raw", into = "Raw")]
pub enum Price {
    Free,
    Amount(Coins),
}

impl Price {
    /// Build a price, mapping 0 to `Free`.
    #[must_use]
    pub fn from_amount(amount: Coins) -> Self {
        if amount <= 0 {
            Self::Free
        } else {
            Self::Amount(amount)
        }
    }

    /// Price per unit in coins.
    #[must_use]
    pub const fn per_unit(&self) -> Coins {
        match self {
            Self::Free => 0,
            Self::Amount(amount) => *amount,
        }
    }

    /// Per-unit value the item fetches when sold back.
    ///
    /// Free items are worth nothing; everything else is worth
    /// `round(price × ratio)`.
    #[must_use]
    pub fn resale_value(&self, ratio: Decimal) -> Coins {
        match self {
            Self::Free => 0,
            Self::Amount(amount) => round_coins(Decimal::from(*amount) * ratio),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "Free"),
            Self::Amount(amount) => write!(f, "${amount}"),
        }
    }
}

impl TryFrom<Raw> for Price {
    type Error = String;

    fn try_from(raw: Raw) -> Result<Self, Self::Error> {
        match raw {
            Raw::Number(n) => Ok(Self::from_amount(n as Coins)),
            Raw::Text(s) if s.eq_ignore_ascii_case("free") => Ok(Self::Free),
            Raw::Text(s) => Err(format!("invalid price `{s}`")),
        }
    }
}

impl From<Price> for Raw {
    fn from(price: Price) -> Self {
        match price {
            Price::Free => Raw::Text("Free".into()),
            Price::Amount(amount) => Raw::Number(amount.max(0) as u64),
        }
    }
}

/// Stock of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Raw", into = "Raw")]
pub enum Stock {
    Unlimited,
    Finite(u64),
}

impl Stock {
    /// Whether `quantity` units can be taken from this stock.
    #[must_use]
    pub const fn covers(&self, quantity: u64) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Finite(available) => *available >= quantity,
        }
    }

    /// Remove `quantity` units. Unlimited stock is unaffected.
    pub fn take(&mut self, quantity: u64) {
        if let Self::Finite(available) = self {
            *available = available.saturating_sub(quantity);
        }
    }
}

impl fmt::Display for Stock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => write!(f, "Unlimited"),
            Self::Finite(n) => write!(f, "{n}"),
        }
    }
}

impl TryFrom<Raw> for Stock {
    type Error = String;

    fn try_from(raw: Raw) -> Result<Self, Self::Error> {
        match raw {
            Raw::Number(n) => Ok(Self::Finite(n)),
            Raw::Text(s) if s.eq_ignore_ascii_case("unlimited") => Ok(Self::Unlimited),
            Raw::Text(s) => Err(format!("invalid quantity `{s}`")),
        }
    }
}

impl From<Stock> for Raw {
    fn from(stock: Stock) -> Self {
        match stock {
            Stock::Unlimited => Raw::Text("Unlimited".into()),
            Stock::Finite(n) => Raw::Number(n),
        }
    }
}

/// Restock interval of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Raw", into = "Raw")]
pub enum Restock {
    Never,
    Days(u64),
}

impl Restock {
    /// Build an interval, mapping 0 to `Never`.
    #[must_use]
    pub const fn from_days(days: u64) -> Self {
        if days == 0 {
            Self::Never
        } else {
            Self::Days(days)
        }
    }
}

impl fmt::Display for Restock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => write!(f, "Never"),
            Self::Days(days) => write!(f, "{days} day(s)"),
        }
    }
}

impl TryFrom<Raw> for Restock {
    type Error = String;

    fn try_from(raw: Raw) -> Result<Self, Self::Error> {
        match raw {
            Raw::Number(n) => Ok(Self::from_days(n)),
            Raw::Text(s) if s.eq_ignore_ascii_case("never") => Ok(Self::Never),
            Raw::Text(s) => Err(format!("invalid refresh time `{s}`")),
        }
    }
}

impl From<Restock> for Raw {
    fn from(restock: Restock) -> Self {
        match restock {
            Restock::Never => Raw::Text("Never".into()),
            Restock::Days(days) => Raw::Number(days),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn zero_price_is_free() {
        assert_eq!(Price::from_amount(0), Price::Free);
        assert_eq!(Price::from_amount(15), Price::Amount(15));
    }

    #[test]
    fn resale_value_is_a_quarter_rounded_half_even() {
        let ratio = dec!(0.25);
        assert_eq!(Price::Amount(100).resale_value(ratio), 25);
        // 2.5 rounds to the even neighbour
        assert_eq!(Price::Amount(10).resale_value(ratio), 2);
        // 3.5 rounds up to 4
        assert_eq!(Price::Amount(14).resale_value(ratio), 4);
        assert_eq!(Price::Free.resale_value(ratio), 0);
    }

    #[test]
    fn sentinels_persist_as_strings() {
        assert_eq!(serde_json::to_string(&Price::Free).unwrap(), r#""Free""#);
        assert_eq!(serde_json::to_string(&Price::Amount(40)).unwrap(), "40");
        assert_eq!(serde_json::to_string(&Stock::Unlimited).unwrap(), r#""Unlimited""#);
        assert_eq!(serde_json::to_string(&Restock::Days(3)).unwrap(), "3");

        let stock: Stock = serde_json::from_str("0").unwrap();
        assert_eq!(stock, Stock::Finite(0));
        let restock: Restock = serde_json::from_str(r#""Never""#).unwrap();
        assert_eq!(restock, Restock::Never);
    }

    #[test]
    fn unknown_sentinel_is_rejected() {
        assert!(serde_json::from_str::<Price>(r#""cheap""#).is_err());
    }

    #[test]
    fn totals_that_overflow_are_refused() {
        assert_eq!(checked_total(4, 25), Some(100));
        assert_eq!(checked_total(4, 1 << 62), None);
        assert_eq!(checked_total(0, u64::MAX), None);
    }

    #[test]
    fn finite_stock_is_consumed() {
        let mut stock = Stock::Finite(3);
        assert!(stock.covers(3));
        assert!(!stock.covers(4));
        stock.take(3);
        assert_eq!(stock, Stock::Finite(0));

        let mut unlimited = Stock::Unlimited;
        unlimited.take(1_000);
        assert_eq!(unlimited, Stock::Unlimited);
    }
}
