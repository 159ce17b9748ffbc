//! Per-server user records: wallet, inventory and betting statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::EconomyError;
use super::ids::ItemId;
use super::money::{checked_total, Coins};

/// One inventory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub name: String,
    pub quantity: u64,
    /// Per-unit resale value.
    pub value: Coins,
}

impl InventoryEntry {
    #[must_use]
    pub fn total_value(&self) -> Coins {
        checked_total(self.value, self.quantity).unwrap_or(Coins::MAX)
    }
}

/// Items owned by one user, keyed by catalog id.
pub type Inventory = BTreeMap<ItemId, InventoryEntry>;

/// Cumulative betting statistics.
///
/// `profit` is derived from `total_currency_won` and
/// `total_currency_lost`. It is persisted for readers of the document but
/// recomputed on load, so a stored value never wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredStats")]
pub struct BetStats {
    pub total_currency_bet: Coins,
    pub total_currency_won: Coins,
    pub total_currency_lost: Coins,
    profit: Coins,
    pub bets_won: u64,
    pub bets_lost: u64,
}

impl BetStats {
    #[must_use]
    pub const fn profit(&self) -> Coins {
        self.profit
    }

    fn recompute_profit(&mut self) {
        self.profit = self.total_currency_won - self.total_currency_lost;
    }
}

#[derive(Deserialize)]
struct StoredStats {
    total_currency_bet: Coins,
    total_currency_won: Coins,
    total_currency_lost: Coins,
    bets_won: u64,
    bets_lost: u64,
}

impl From<StoredStats> for BetStats {
    fn from(stored: StoredStats) -> Self {
        let mut stats = Self {
            total_currency_bet: stored.total_currency_bet,
            total_currency_won: stored.total_currency_won,
            total_currency_lost: stored.total_currency_lost,
            profit: 0,
            bets_won: stored.bets_won,
            bets_lost: stored.bets_lost,
        };
        stats.recompute_profit();
        stats
    }
}

/// A user's economy record within one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub display_name: String,
    pub account_name: String,
    wallet: Coins,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(flatten)]
    stats: BetStats,
}

impl User {
    /// Create a fresh record with the starting wallet.
    #[must_use]
    pub fn new(
        display_name: impl Into<String>,
        account_name: impl Into<String>,
        starting_wallet: Coins,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            account_name: account_name.into(),
            wallet: starting_wallet.max(0),
            inventory: Inventory::new(),
            stats: BetStats::default(),
        }
    }

    #[must_use]
    pub const fn wallet(&self) -> Coins {
        self.wallet
    }

    #[must_use]
    pub const fn stats(&self) -> &BetStats {
        &self.stats
    }

    /// Whether the wallet covers `amount`.
    #[must_use]
    pub const fn can_afford(&self, amount: Coins) -> bool {
        self.wallet >= amount
    }

    /// Take `amount` from the wallet. Never leaves the balance negative.
    pub fn debit(&mut self, amount: Coins) -> Result<(), EconomyError> {
        if amount < 0 || !self.can_afford(amount) {
            return Err(EconomyError::InsufficientFunds {
                available: self.wallet,
                required: amount,
            });
        }
        self.wallet -= amount;
        Ok(())
    }

    /// Add `amount` to the wallet. Negative amounts are ignored.
    pub fn credit(&mut self, amount: Coins) {
        self.wallet = self.wallet.saturating_add(amount.max(0));
    }

    /// Record a stake placed on a prediction.
    pub fn record_stake(&mut self, amount: Coins) {
        self.stats.total_currency_bet += amount;
    }

    /// Record a winning prediction and credit the winnings.
    pub fn record_win(&mut self, winnings: Coins) {
        self.credit(winnings);
        self.stats.bets_won += 1;
        self.stats.total_currency_won += winnings;
        self.stats.recompute_profit();
    }

    /// Record a losing prediction. The stake was already debited.
    pub fn record_loss(&mut self, stake: Coins) {
        self.stats.bets_lost += 1;
        self.stats.total_currency_lost += stake;
        self.stats.recompute_profit();
    }

    /// Add items, merging into an existing slot.
    ///
    /// A merge refreshes the slot's name and value so later catalog edits
    /// are reflected.
    pub fn add_item(&mut self, item_id: ItemId, name: &str, quantity: u64, value: Coins) {
        let entry = self.inventory.entry(item_id).or_insert_with(|| InventoryEntry {
            name: name.to_string(),
            quantity: 0,
            value,
        });
        entry.quantity = entry.quantity.saturating_add(quantity);
        entry.name = name.to_string();
        entry.value = value;
    }

    /// Find an inventory slot by case-insensitive name.
    #[must_use]
    pub fn find_item(&self, name: &str) -> Option<(ItemId, &InventoryEntry)> {
        self.inventory
            .iter()
            .find(|(_, entry)| entry.name.eq_ignore_ascii_case(name))
            .map(|(id, entry)| (*id, entry))
    }

    /// Remove `quantity` units of the named item, dropping the slot at zero.
    ///
    /// Returns the removed slot's id and a snapshot of the entry before
    /// removal.
    pub fn remove_item(
        &mut self,
        name: &str,
        quantity: u64,
    ) -> Result<(ItemId, InventoryEntry), EconomyError> {
        let (item_id, snapshot) = match self.find_item(name) {
            Some((id, entry)) if entry.quantity >= quantity => (id, entry.clone()),
            found => {
                return Err(EconomyError::InsufficientInventory {
                    item: name.to_string(),
                    available: found.map_or(0, |(_, entry)| entry.quantity),
                    required: quantity,
                })
            }
        };

        if snapshot.quantity == quantity {
            self.inventory.remove(&item_id);
        } else if let Some(entry) = self.inventory.get_mut(&item_id) {
            entry.quantity -= quantity;
        }
        Ok((item_id, snapshot))
    }

    /// Whether `name` matches this user's display or account name.
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.display_name.eq_ignore_ascii_case(name) || self.account_name.eq_ignore_ascii_case(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new("Alice", "alice", 500)
    }

    #[test]
    fn debit_never_goes_negative() {
        let mut u = user();
        let err = u.debit(501).unwrap_err();
        assert_eq!(
            err,
            EconomyError::InsufficientFunds {
                available: 500,
                required: 501
            }
        );
        assert_eq!(u.wallet(), 500);

        u.debit(500).unwrap();
        assert_eq!(u.wallet(), 0);
    }

    #[test]
    fn credit_adds_exactly() {
        let mut u = user();
        u.credit(1_234);
        assert_eq!(u.wallet(), 1_734);
    }

    #[test]
    fn profit_tracks_won_minus_lost() {
        let mut u = user();
        u.record_loss(200);
        assert_eq!(u.stats().profit(), -200);
        u.record_win(500);
        assert_eq!(u.stats().profit(), 300);
        assert_eq!(u.stats().bets_won, 1);
        assert_eq!(u.stats().bets_lost, 1);
        assert_eq!(u.wallet(), 1_000);
    }

    #[test]
    fn items_merge_and_refresh_metadata() {
        let mut u = user();
        u.add_item(ItemId::new(1), "Hat", 1, 25);
        u.add_item(ItemId::new(1), "Top Hat", 2, 30);

        let entry = &u.inventory[&ItemId::new(1)];
        assert_eq!(entry.quantity, 3);
        assert_eq!(entry.name, "Top Hat");
        assert_eq!(entry.value, 30);
    }

    #[test]
    fn removing_everything_drops_the_slot() {
        let mut u = user();
        u.add_item(ItemId::new(4), "Sword", 2, 10);

        let (id, snapshot) = u.remove_item("sword", 1).unwrap();
        assert_eq!(id, ItemId::new(4));
        assert_eq!(snapshot.quantity, 2);
        assert_eq!(u.inventory[&id].quantity, 1);

        u.remove_item("SWORD", 1).unwrap();
        assert!(u.inventory.is_empty());
    }

    #[test]
    fn removing_too_many_is_rejected() {
        let mut u = user();
        u.add_item(ItemId::new(4), "Sword", 1, 10);
        let err = u.remove_item("Sword", 2).unwrap_err();
        assert!(matches!(
            err,
            EconomyError::InsufficientInventory {
                available: 1,
                required: 2,
                ..
            }
        ));

        let err = u.remove_item("Shield", 1).unwrap_err();
        assert!(matches!(
            err,
            EconomyError::InsufficientInventory { available: 0, .. }
        ));
    }

    #[test]
    fn persisted_record_carries_profit_field() {
        let mut u = user();
        u.record_loss(50);
        let json = serde_json::to_value(&u).unwrap();
        assert_eq!(json["profit"], -50);
        assert_eq!(json["wallet"], 500);

        let back: User = serde_json::from_value(json).unwrap();
        assert_eq!(back, u);
    }

    #[test]
    fn stored_profit_is_recomputed_on_load() {
        let json = serde_json::json!({
            "display_name": "Alice",
            "account_name": "alice",
            "wallet": 500,
            "inventory": {},
            "total_currency_bet": 300,
            "total_currency_won": 400,
            "total_currency_lost": 100,
            "profit": 9999,
            "bets_won": 1,
            "bets_lost": 1
        });
        let loaded: User = serde_json::from_value(json).unwrap();
        assert_eq!(loaded.stats().profit(), 300);
    }
}
