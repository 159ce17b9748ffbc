//! Shop service: catalog administration, buying and selling.

use std::sync::Arc;

use tracing::info;

use crate::domain::{
    checked_total, Coins, EconomyError, EconomyRules, EditReport, ItemId, Purchase, ServerId,
    ShopDoc, ShopItem, UserId, UsersDoc,
};
use crate::error::Result;
use crate::port::Store;

/// A completed sale back to the shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sale {
    pub item_id: ItemId,
    pub name: String,
    pub quantity: u64,
    pub proceeds: Coins,
    pub wallet: Coins,
}

/// A completed purchase and the buyer's balance after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub purchase: Purchase,
    pub wallet: Coins,
}

pub struct ShopService<S> {
    store: Arc<S>,
    rules: EconomyRules,
}

impl<S: Store> ShopService<S> {
    pub fn new(store: Arc<S>, rules: EconomyRules) -> Self {
        Self { store, rules }
    }

    /// Items on sale, in id order.
    pub async fn list_active(&self, server: ServerId) -> Result<Vec<(ItemId, ShopItem)>> {
        let doc: ShopDoc = self.store.load().await?;
        Ok(doc
            .get(server)
            .map(|shop| {
                shop.list_active()
                    .into_iter()
                    .map(|(id, item)| (id, item.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn create_item(
        &self,
        server: ServerId,
        name: &str,
        price: Coins,
        quantity: Option<u64>,
        refresh_days: Option<u64>,
    ) -> Result<ItemId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EconomyError::validation("An item needs a name.").into());
        }
        if price < 0 {
            return Err(EconomyError::validation("The price can not be negative.").into());
        }

        let mut doc: ShopDoc = self.store.load().await?;
        let id = doc
            .server_mut(server)
            .create_item(name, price, quantity, refresh_days)?;
        self.store.save(&doc).await?;
        info!(server = %server, item = %id, name, price, "Shop item created");
        Ok(id)
    }

    /// Apply attribute edits; the item is reactivated.
    pub async fn edit_item(
        &self,
        server: ServerId,
        name: &str,
        edits: &[(String, String)],
    ) -> Result<EditReport> {
        let mut doc: ShopDoc = self.store.load().await?;
        let report = doc.server_mut(server).edit_item(name.trim(), edits)?;
        self.store.save(&doc).await?;
        info!(
            server = %server,
            name,
            applied = ?report.applied,
            skipped = ?report.skipped,
            "Shop item edited"
        );
        Ok(report)
    }

    /// Take an item off sale. Returns the stored name.
    pub async fn delete_item(&self, server: ServerId, name: &str) -> Result<String> {
        let mut doc: ShopDoc = self.store.load().await?;
        let shop = doc.server_mut(server);
        let id = shop.deactivate_item(name.trim())?;
        let stored = shop
            .items
            .get(&id)
            .map_or_else(|| name.to_string(), |item| item.name.clone());
        self.store.save(&doc).await?;
        info!(server = %server, item = %id, "Shop item deleted");
        Ok(stored)
    }

    /// Buy `quantity` units for `user`.
    pub async fn buy(
        &self,
        server: ServerId,
        user: UserId,
        name: &str,
        quantity: u64,
    ) -> Result<Receipt> {
        if quantity == 0 {
            return Err(EconomyError::validation("The quantity needs to be at least 1.").into());
        }

        let mut shop: ShopDoc = self.store.load().await?;
        let mut users: UsersDoc = self.store.load().await?;
        let buyer = users
            .server_mut(server)
            .get_mut(&user)
            .ok_or_else(|| EconomyError::not_found(format!("User {user}")))?;

        let purchase =
            shop.server_mut(server)
                .purchase(name.trim(), quantity, self.rules.resale_ratio, buyer)?;
        let wallet = buyer.wallet();

        self.store.save(&users).await?;
        self.store.save(&shop).await?;
        info!(
            server = %server,
            user = %user,
            item = %purchase.item_id,
            quantity,
            cost = purchase.cost,
            "Item bought"
        );
        Ok(Receipt { purchase, wallet })
    }

    /// Sell `quantity` units back at their stored per-unit value.
    pub async fn sell(
        &self,
        server: ServerId,
        user: UserId,
        name: &str,
        quantity: u64,
    ) -> Result<Sale> {
        if quantity == 0 {
            return Err(EconomyError::validation("The quantity needs to be at least 1.").into());
        }

        let mut users: UsersDoc = self.store.load().await?;
        let seller = users
            .server_mut(server)
            .get_mut(&user)
            .ok_or_else(|| EconomyError::not_found(format!("User {user}")))?;

        let (item_id, entry) = seller.remove_item(name.trim(), quantity)?;
        let proceeds = checked_total(entry.value, quantity)
            .ok_or_else(|| EconomyError::validation("That sale is too large."))?;
        seller.credit(proceeds);
        let sale = Sale {
            item_id,
            name: entry.name,
            quantity,
            proceeds,
            wallet: seller.wallet(),
        };

        self.store.save(&users).await?;
        info!(
            server = %server,
            user = %user,
            item = %item_id,
            quantity,
            proceeds,
            "Item sold"
        );
        Ok(sale)
    }
}
