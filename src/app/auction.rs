//! Auction service: creation, bidding and timer-driven resolution.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::render;
use super::timer::AuctionTimers;
use crate::domain::{
    Auction, AuctionId, Coins, EconomyError, EconomyRules, ServerId, Settlement, SettingsDoc,
    ShopDoc, TimeLeft, UserId, UsersDoc,
};
use crate::error::Result;
use crate::port::{Messenger, Store};

/// Delay before a failed resolution is attempted again.
pub const RESOLVE_RETRY_SECS: i64 = 30;

/// A resolved auction and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub auction_id: AuctionId,
    pub auction: Auction,
    pub settlement: Settlement,
}

/// One row of the auction listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionView {
    pub id: AuctionId,
    pub auction: Auction,
    /// `None` for moderator auctions.
    pub owner_name: Option<String>,
    pub time_left: TimeLeft,
}

/// Terms shared by both ways of opening an auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terms {
    pub quantity: u64,
    pub starting_bid: Coins,
    pub minutes: u64,
}

impl Terms {
    fn deadline(&self, now: DateTime<Utc>) -> std::result::Result<DateTime<Utc>, EconomyError> {
        if self.quantity == 0 || self.starting_bid <= 0 || self.minutes == 0 {
            return Err(EconomyError::validation(
                "Quantity, starting bid and duration need to be positive.",
            ));
        }
        i64::try_from(self.minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .and_then(|duration| now.checked_add_signed(duration))
            .ok_or_else(|| EconomyError::validation("That auction would run for too long."))
    }
}

pub struct AuctionService<S> {
    store: Arc<S>,
    messenger: Arc<dyn Messenger>,
    timers: AuctionTimers,
    rules: EconomyRules,
}

impl<S: Store> AuctionService<S> {
    pub fn new(
        store: Arc<S>,
        messenger: Arc<dyn Messenger>,
        timers: AuctionTimers,
        rules: EconomyRules,
    ) -> Self {
        Self {
            store,
            messenger,
            timers,
            rules,
        }
    }

    #[must_use]
    pub fn timers(&self) -> &AuctionTimers {
        &self.timers
    }

    /// Auction items out of the owner's inventory.
    ///
    /// The items leave the inventory now and come back only if the
    /// auction does not sell.
    pub async fn create_from_inventory(
        &self,
        server: ServerId,
        owner: UserId,
        item: &str,
        terms: Terms,
        now: DateTime<Utc>,
    ) -> Result<(AuctionId, Auction)> {
        let end = terms.deadline(now)?;

        let mut users: UsersDoc = self.store.load().await?;
        let mut shop: ShopDoc = self.store.load().await?;

        let seller = users
            .server_mut(server)
            .get_mut(&owner)
            .ok_or_else(|| EconomyError::not_found(format!("User {owner}")))?;
        let (item_id, entry) = seller.remove_item(item.trim(), terms.quantity)?;

        let auction = Auction::new(
            entry.name,
            Some(item_id),
            terms.quantity,
            entry.value,
            terms.starting_bid,
            end,
            Some(owner),
        );
        let partition = shop.server_mut(server);
        let id = partition.allocate_auction_id();
        partition.auctions.insert(id, auction.clone());

        self.store.save(&users).await?;
        self.store.save(&shop).await?;
        self.timers.schedule(server, id, end);
        info!(
            server = %server,
            auction = %id,
            owner = %owner,
            item = %auction.item,
            quantity = terms.quantity,
            "Auction opened from inventory"
        );
        Ok((id, auction))
    }

    /// Auction an item on behalf of the shop.
    ///
    /// A name missing from the catalog creates a hidden catalog entry.
    pub async fn create_moderated(
        &self,
        server: ServerId,
        item: &str,
        terms: Terms,
        now: DateTime<Utc>,
    ) -> Result<(AuctionId, Auction)> {
        let end = terms.deadline(now)?;
        let item = item.trim();
        if item.is_empty() {
            return Err(EconomyError::validation("An auction needs an item name.").into());
        }

        let mut shop: ShopDoc = self.store.load().await?;
        let partition = shop.server_mut(server);
        let lot = partition.moderator_lot(
            item,
            terms.starting_bid,
            self.rules.moderator_price_multiplier,
            self.rules.resale_ratio,
        )?;
        let auction = Auction::new(
            lot.name,
            lot.item_id,
            terms.quantity,
            lot.unit_value,
            terms.starting_bid,
            end,
            None,
        );
        let id = partition.allocate_auction_id();
        partition.auctions.insert(id, auction.clone());

        self.store.save(&shop).await?;
        self.timers.schedule(server, id, end);
        info!(
            server = %server,
            auction = %id,
            item = %auction.item,
            quantity = terms.quantity,
            "Moderator auction opened"
        );
        Ok((id, auction))
    }

    /// Bid on a running auction. Nothing is held back from the wallet.
    pub async fn bid(
        &self,
        server: ServerId,
        bidder: UserId,
        auction_id: AuctionId,
        amount: Coins,
        now: DateTime<Utc>,
    ) -> Result<Auction> {
        if amount <= 0 {
            return Err(EconomyError::validation("The bid needs to be a positive amount.").into());
        }

        let mut shop: ShopDoc = self.store.load().await?;
        let users: UsersDoc = self.store.load().await?;

        let auction = shop
            .get_mut(server)
            .and_then(|partition| partition.auctions.get_mut(&auction_id))
            .ok_or_else(|| EconomyError::AuctionNotFound {
                id: auction_id.to_string(),
            })?;
        let user = users
            .get(server)
            .and_then(|partition| partition.get(&bidder))
            .ok_or_else(|| EconomyError::not_found(format!("User {bidder}")))?;

        auction.place_bid(bidder, user.display_name.clone(), amount, user.wallet(), now)?;
        let snapshot = auction.clone();

        self.store.save(&shop).await?;
        info!(
            server = %server,
            auction = %auction_id,
            bidder = %bidder,
            amount,
            "Bid accepted"
        );
        Ok(snapshot)
    }

    /// Settle and delete an auction, then announce the outcome.
    ///
    /// Returns `None` when the auction no longer exists. If loading or
    /// saving fails the timer is re-armed to try again after
    /// [`RESOLVE_RETRY_SECS`].
    pub async fn resolve(
        &self,
        server: ServerId,
        auction_id: AuctionId,
    ) -> Result<Option<Resolution>> {
        let resolution = match self.settle(server, auction_id).await {
            Ok(resolution) => resolution,
            Err(e) => {
                self.timers.complete(server, auction_id);
                let retry_at = Utc::now() + Duration::seconds(RESOLVE_RETRY_SECS);
                self.timers.schedule(server, auction_id, retry_at);
                warn!(server = %server, auction = %auction_id, "Auction resolution will be retried");
                return Err(e);
            }
        };
        self.timers.complete(server, auction_id);

        let Some(resolution) = resolution else {
            warn!(server = %server, auction = %auction_id, "Auction to resolve is gone");
            return Ok(None);
        };
        info!(
            server = %server,
            auction = %auction_id,
            outcome = ?resolution.settlement,
            "Auction resolved"
        );
        self.announce(server, &resolution).await;
        Ok(Some(resolution))
    }

    /// The shop is saved first: once the auction is gone from the store a
    /// retry finds nothing to settle twice.
    async fn settle(&self, server: ServerId, auction_id: AuctionId) -> Result<Option<Resolution>> {
        let mut shop: ShopDoc = self.store.load().await?;
        let Some(auction) = shop
            .get_mut(server)
            .and_then(|partition| partition.auctions.remove(&auction_id))
        else {
            return Ok(None);
        };

        let mut users: UsersDoc = self.store.load().await?;
        let settlement = auction.settle(users.server_mut(server));

        self.store.save(&shop).await?;
        self.store.save(&users).await?;
        Ok(Some(Resolution {
            auction_id,
            auction,
            settlement,
        }))
    }

    async fn announce(&self, server: ServerId, resolution: &Resolution) {
        let channel = match self.store.load::<SettingsDoc>().await {
            Ok(doc) => doc.get(server).and_then(|s| s.default_channel),
            Err(e) => {
                warn!(server = %server, error = %e, "Could not read settings for auction notice");
                None
            }
        };
        let Some(channel) = channel else {
            warn!(
                server = %server,
                auction = %resolution.auction_id,
                "No default channel, auction notice dropped"
            );
            return;
        };

        let notice = render::auction_notice(resolution);
        if let Err(e) = self.messenger.deliver(server, channel, &notice).await {
            warn!(server = %server, channel = %channel, error = %e, "Auction notice not delivered");
        }
    }

    /// Running auctions with their owners' current names.
    pub async fn list(&self, server: ServerId, now: DateTime<Utc>) -> Result<Vec<AuctionView>> {
        let shop: ShopDoc = self.store.load().await?;
        let users: UsersDoc = self.store.load().await?;
        let Some(partition) = shop.get(server) else {
            return Ok(Vec::new());
        };

        let mut views = Vec::with_capacity(partition.auctions.len());
        for (id, auction) in &partition.auctions {
            let owner_name = match auction.owner {
                Some(owner) => Some(self.owner_name(server, owner, &users).await),
                None => None,
            };
            views.push(AuctionView {
                id: *id,
                auction: auction.clone(),
                owner_name,
                time_left: auction.time_left(now),
            });
        }
        Ok(views)
    }

    async fn owner_name(&self, server: ServerId, owner: UserId, users: &UsersDoc) -> String {
        let stored = || {
            users
                .get(server)
                .and_then(|partition| partition.get(&owner))
                .map_or_else(|| "Unknown".to_string(), |user| user.display_name.clone())
        };
        match self.messenger.resolve_display_name(server, owner).await {
            Ok(Some(name)) => name,
            Ok(None) => stored(),
            Err(e) => {
                warn!(server = %server, user = %owner, error = %e, "Falling back to stored name");
                stored()
            }
        }
    }

    /// Give every persisted auction a timer. Returns how many were scheduled.
    pub async fn restore_timers(&self) -> Result<usize> {
        let shop: ShopDoc = self.store.load().await?;
        let mut scheduled = 0;
        for (server, partition) in shop.servers() {
            for (id, auction) in &partition.auctions {
                if self.timers.schedule(server, *id, auction.auction_end) {
                    scheduled += 1;
                }
            }
        }
        info!(scheduled, "Auction timers restored");
        Ok(scheduled)
    }
}
