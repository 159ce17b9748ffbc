//! Shop catalog and the per-server commerce partition.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::auction::Auction;
use super::error::EconomyError;
use super::ids::{AuctionId, ItemId};
use super::money::{checked_total, Coins, Price, Restock, Stock};
use super::user::User;

/// Attributes `edit_item` may change.
pub const EDITABLE_ATTRIBUTES: &[&str] = &["name", "price", "quantity", "refresh_time"];

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub name: String,
    pub price: Price,
    pub quantity: Stock,
    pub refresh_time: Restock,
    /// Inactive items are hidden from listings but keep their id.
    pub active: bool,
}

/// Stock annotation shown in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    Unlimited,
    Available(u64),
    Restocks { days: u64 },
    OutOfStock,
}

impl ShopItem {
    #[must_use]
    pub fn stock_status(&self) -> StockStatus {
        match (self.quantity, self.refresh_time) {
            (Stock::Unlimited, _) => StockStatus::Unlimited,
            (Stock::Finite(0), Restock::Days(days)) => StockStatus::Restocks { days },
            (Stock::Finite(0), Restock::Never) => StockStatus::OutOfStock,
            (Stock::Finite(n), _) => StockStatus::Available(n),
        }
    }
}

/// Outcome of an `edit_item` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

/// A completed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub item_id: ItemId,
    pub name: String,
    pub quantity: u64,
    pub cost: Coins,
    pub unit_value: Coins,
}

/// What a moderator auction puts up for sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lot {
    /// Catalog item the lot came from; `None` when a hidden entry was
    /// created for it.
    pub item_id: Option<ItemId>,
    pub name: String,
    pub unit_value: Coins,
}

/// Catalog, auctions and id counters for one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerShop {
    pub next_item_id: ItemId,
    pub next_auction_id: AuctionId,
    #[serde(default)]
    pub items: BTreeMap<ItemId, ShopItem>,
    #[serde(default)]
    pub auctions: BTreeMap<AuctionId, Auction>,
}

impl Default for ServerShop {
    fn default() -> Self {
        Self {
            next_item_id: ItemId::new(1),
            next_auction_id: AuctionId::new(1),
            items: BTreeMap::new(),
            auctions: BTreeMap::new(),
        }
    }
}

impl ServerShop {
    /// Find a catalog entry by case-insensitive name, active or not.
    #[must_use]
    pub fn find_item(&self, name: &str) -> Option<(ItemId, &ShopItem)> {
        self.items
            .iter()
            .find(|(_, item)| item.name.eq_ignore_ascii_case(name))
            .map(|(id, item)| (*id, item))
    }

    fn find_item_id(&self, name: &str) -> Option<ItemId> {
        self.find_item(name).map(|(id, _)| id)
    }

    fn allocate_item_id(&mut self) -> ItemId {
        let id = self.next_item_id;
        self.next_item_id = id.next();
        id
    }

    /// Allocate the next auction id.
    pub fn allocate_auction_id(&mut self) -> AuctionId {
        let id = self.next_auction_id;
        self.next_auction_id = id.next();
        id
    }

    /// Active items in id order.
    #[must_use]
    pub fn list_active(&self) -> Vec<(ItemId, &ShopItem)> {
        self.items
            .iter()
            .filter(|(_, item)| item.active)
            .map(|(id, item)| (*id, item))
            .collect()
    }

    /// Add a new active item.
    pub fn create_item(
        &mut self,
        name: &str,
        price: Coins,
        quantity: Option<u64>,
        refresh_days: Option<u64>,
    ) -> Result<ItemId, EconomyError> {
        if self.find_item(name).is_some() {
            return Err(EconomyError::DuplicateItem {
                name: name.to_string(),
            });
        }

        let id = self.allocate_item_id();
        self.items.insert(
            id,
            ShopItem {
                name: name.to_string(),
                price: Price::from_amount(price),
                quantity: quantity.map_or(Stock::Unlimited, Stock::Finite),
                refresh_time: refresh_days.map_or(Restock::Never, Restock::from_days),
                active: true,
            },
        );
        Ok(id)
    }

    /// Apply `(attribute, value)` edits and reactivate the item.
    ///
    /// Unknown attributes are skipped. A non-numeric value for a numeric
    /// attribute rejects the whole edit.
    pub fn edit_item(
        &mut self,
        name: &str,
        edits: &[(String, String)],
    ) -> Result<EditReport, EconomyError> {
        let Some(id) = self.find_item_id(name) else {
            return Err(EconomyError::not_found(name));
        };

        let mut updated = self.items[&id].clone();
        let mut report = EditReport::default();

        for (attribute, value) in edits {
            let attribute = attribute.trim().to_lowercase();
            let value = value.trim();
            if !EDITABLE_ATTRIBUTES.contains(&attribute.as_str()) {
                report.skipped.push(attribute);
                continue;
            }

            if attribute == "name" {
                if let Some(other) = self.find_item_id(value) {
                    if other != id {
                        return Err(EconomyError::DuplicateItem {
                            name: value.to_string(),
                        });
                    }
                }
                updated.name = value.to_string();
            } else {
                let number: u64 = value.parse().map_err(|_| {
                    EconomyError::validation(format!("{attribute} needs to be a number."))
                })?;
                match attribute.as_str() {
                    "price" => updated.price = Price::from_amount(number as Coins),
                    "quantity" if number == 0 => updated.quantity = Stock::Unlimited,
                    "quantity" => updated.quantity = Stock::Finite(number),
                    _ => updated.refresh_time = Restock::from_days(number),
                }
            }
            report.applied.push(attribute);
        }

        updated.active = true;
        self.items.insert(id, updated);
        Ok(report)
    }

    /// Soft-delete an item by name.
    pub fn deactivate_item(&mut self, name: &str) -> Result<ItemId, EconomyError> {
        let id = self
            .find_item_id(name)
            .ok_or_else(|| EconomyError::not_found(name))?;
        if let Some(item) = self.items.get_mut(&id) {
            item.active = false;
        }
        Ok(id)
    }

    /// Sell `quantity` units of the named item to `buyer`.
    ///
    /// Matches inactive items too. Funds are checked before stock.
    pub fn purchase(
        &mut self,
        name: &str,
        quantity: u64,
        resale_ratio: Decimal,
        buyer: &mut User,
    ) -> Result<Purchase, EconomyError> {
        let id = self
            .find_item_id(name)
            .ok_or_else(|| EconomyError::not_found(name))?;
        let Some(item) = self.items.get_mut(&id) else {
            return Err(EconomyError::not_found(name));
        };

        let cost = checked_total(item.price.per_unit(), quantity)
            .ok_or_else(|| EconomyError::validation("That order is too large."))?;
        let unit_value = item.price.resale_value(resale_ratio);

        if !buyer.can_afford(cost) {
            return Err(EconomyError::InsufficientFunds {
                available: buyer.wallet(),
                required: cost,
            });
        }
        if !item.quantity.covers(quantity) {
            return Err(EconomyError::OutOfStock {
                item: item.name.clone(),
            });
        }

        buyer.debit(cost)?;
        item.quantity.take(quantity);
        buyer.add_item(id, &item.name, quantity, unit_value);

        Ok(Purchase {
            item_id: id,
            name: item.name.clone(),
            quantity,
            cost,
            unit_value,
        })
    }

    /// Resolve what a moderator auction sells.
    ///
    /// An existing catalog entry is referenced as-is. Otherwise a hidden,
    /// inactive entry priced at `price_multiplier × starting_bid` is added
    /// and the lot keeps no item id.
    pub fn moderator_lot(
        &mut self,
        name: &str,
        starting_bid: Coins,
        price_multiplier: Coins,
        resale_ratio: Decimal,
    ) -> Result<Lot, EconomyError> {
        if let Some((id, item)) = self.find_item(name) {
            return Ok(Lot {
                item_id: Some(id),
                name: item.name.clone(),
                unit_value: item.price.resale_value(resale_ratio),
            });
        }

        let price = starting_bid
            .checked_mul(price_multiplier)
            .ok_or_else(|| EconomyError::validation("That starting bid is too large."))?;

        let id = self.allocate_item_id();
        self.items.insert(
            id,
            ShopItem {
                name: name.to_string(),
                price: Price::from_amount(price),
                quantity: Stock::Unlimited,
                refresh_time: Restock::Never,
                active: false,
            },
        );
        Ok(Lot {
            item_id: None,
            name: name.to_string(),
            unit_value: starting_bid,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn edits(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(a, v)| ((*a).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn create_assigns_ids_and_defaults() {
        let mut shop = ServerShop::default();
        let hat = shop.create_item("Hat", 100, None, None).unwrap();
        let gem = shop.create_item("Gem", 0, Some(0), Some(3)).unwrap();

        assert_eq!(hat, ItemId::new(1));
        assert_eq!(gem, ItemId::new(2));
        assert_eq!(shop.items[&hat].quantity, Stock::Unlimited);
        assert_eq!(shop.items[&hat].refresh_time, Restock::Never);
        assert_eq!(shop.items[&gem].price, Price::Free);
        assert_eq!(shop.items[&gem].stock_status(), StockStatus::Restocks { days: 3 });
    }

    #[test]
    fn duplicate_names_collide_with_inactive_items() {
        let mut shop = ServerShop::default();
        shop.create_item("Hat", 100, None, None).unwrap();
        shop.deactivate_item("hat").unwrap();

        let err = shop.create_item("HAT", 5, None, None).unwrap_err();
        assert!(matches!(err, EconomyError::DuplicateItem { .. }));
        assert!(shop.list_active().is_empty());
    }

    #[test]
    fn edit_maps_zero_to_sentinels_and_reactivates() {
        let mut shop = ServerShop::default();
        let id = shop.create_item("Hat", 100, Some(5), Some(2)).unwrap();
        shop.deactivate_item("Hat").unwrap();

        let report = shop
            .edit_item(
                "hat",
                &edits(&[("price", "0"), ("Quantity", "0"), ("refresh_time", "0"), ("colour", "red")]),
            )
            .unwrap();

        let item = &shop.items[&id];
        assert_eq!(item.price, Price::Free);
        assert_eq!(item.quantity, Stock::Unlimited);
        assert_eq!(item.refresh_time, Restock::Never);
        assert!(item.active);
        assert_eq!(report.applied, vec!["price", "quantity", "refresh_time"]);
        assert_eq!(report.skipped, vec!["colour"]);
    }

    #[test]
    fn edit_with_non_numeric_value_changes_nothing() {
        let mut shop = ServerShop::default();
        let id = shop.create_item("Hat", 100, None, None).unwrap();
        let before = shop.items[&id].clone();

        let err = shop
            .edit_item("Hat", &edits(&[("name", "Cap"), ("price", "lots")]))
            .unwrap_err();
        assert!(matches!(err, EconomyError::Validation { .. }));
        assert_eq!(shop.items[&id], before);
    }

    #[test]
    fn purchase_checks_funds_then_stock() {
        let mut shop = ServerShop::default();
        shop.create_item("Gem", 100, Some(1), None).unwrap();
        let mut buyer = User::new("Bob", "bob", 150);

        let err = shop.purchase("gem", 2, dec!(0.25), &mut buyer).unwrap_err();
        assert!(matches!(err, EconomyError::InsufficientFunds { .. }));

        let mut rich = User::new("Rich", "rich", 1_000);
        let err = shop.purchase("gem", 2, dec!(0.25), &mut rich).unwrap_err();
        assert!(matches!(err, EconomyError::OutOfStock { .. }));
        assert_eq!(rich.wallet(), 1_000);

        let purchase = shop.purchase("GEM", 1, dec!(0.25), &mut rich).unwrap();
        assert_eq!(purchase.cost, 100);
        assert_eq!(purchase.unit_value, 25);
        assert_eq!(rich.wallet(), 900);
        assert_eq!(shop.items[&purchase.item_id].quantity, Stock::Finite(0));
    }

    #[test]
    fn purchase_ignores_the_active_flag() {
        let mut shop = ServerShop::default();
        shop.create_item("Relic", 10, None, None).unwrap();
        shop.deactivate_item("Relic").unwrap();
        let mut buyer = User::new("Bob", "bob", 100);

        assert!(shop.purchase("relic", 1, dec!(0.25), &mut buyer).is_ok());
    }

    #[test]
    fn moderator_lot_creates_hidden_entry() {
        let mut shop = ServerShop::default();
        let lot = shop.moderator_lot("Crown", 50, 4, dec!(0.25)).unwrap();

        assert_eq!(lot.item_id, None);
        assert_eq!(lot.unit_value, 50);
        let (_, item) = shop.find_item("crown").unwrap();
        assert_eq!(item.price, Price::Amount(200));
        assert!(!item.active);

        let again = shop.moderator_lot("crown", 10, 4, dec!(0.25)).unwrap();
        assert_eq!(again.item_id, Some(ItemId::new(1)));
        assert_eq!(again.name, "Crown");
        assert_eq!(again.unit_value, 50);
    }

    #[test]
    fn oversized_moderator_lot_adds_nothing() {
        let mut shop = ServerShop::default();
        let err = shop.moderator_lot("Crown", Coins::MAX, 4, dec!(0.25)).unwrap_err();
        assert!(matches!(err, EconomyError::Validation { .. }));
        assert!(shop.items.is_empty());
    }
}
