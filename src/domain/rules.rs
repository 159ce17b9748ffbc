//! Tunable economy constants.

use rust_decimal::Decimal;

use super::money::Coins;

/// Economy constants shared by every server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EconomyRules {
    /// Wallet of a newly seen user.
    pub starting_wallet: Coins,
    /// Bonus added to a prediction's pool per option.
    pub bonus_per_option: Coins,
    /// Fraction of the purchase price an item resells for.
    pub resale_ratio: Decimal,
    /// Catalog price of a hidden item created by a moderator auction,
    /// as a multiple of the starting bid.
    pub moderator_price_multiplier: Coins,
}

impl Default for EconomyRules {
    fn default() -> Self {
        Self {
            starting_wallet: 500,
            bonus_per_option: 100,
            resale_ratio: Decimal::new(25, 2), // 0.25
            moderator_price_multiplier: 4,
        }
    }
}
