//! Timed auctions: bidding rules and the settlement fallback chain.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::EconomyError;
use super::ids::{ItemId, UserId};
use super::money::Coins;
use super::user::User;

/// A single bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub bidder: UserId,
    /// Display name when the bid was placed.
    pub name: String,
    pub amount: Coins,
    pub placed_at: DateTime<Utc>,
}

/// An active auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub item: String,
    /// Source catalog entry, if the lot had one.
    pub item_id: Option<ItemId>,
    pub quantity: u64,
    /// Per-unit value used when items go back to the owner.
    pub value: Coins,
    pub current_bid: Coins,
    pub current_highest_bidder: Option<UserId>,
    #[serde(default)]
    pub bids: Vec<Bid>,
    pub auction_end: DateTime<Utc>,
    /// Seller; `None` for moderator auctions.
    pub owner: Option<UserId>,
    pub number_of_bids: u64,
}

/// Why an auction ended without a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsoldReason {
    NoBids,
    /// The only bidder could not pay.
    HighestBidderShort,
    /// Nobody in the bid history could pay their bid.
    NoAffordableBidder,
}

/// How an auction ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Sold {
        winner: UserId,
        winner_name: String,
        price: Coins,
    },
    Unsold {
        reason: UnsoldReason,
        /// Whether the items went back to an owner (otherwise they vanish).
        returned: bool,
    },
}

/// Coarse remaining time for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLeft {
    Expired,
    Minutes(i64),
    Hours(i64),
    Days(i64),
}

impl fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "Expired"),
            Self::Minutes(n) => write!(f, "{n} minute(s)"),
            Self::Hours(n) => write!(f, "{n} hour(s)"),
            Self::Days(n) => write!(f, "{n} day(s)"),
        }
    }
}

fn rounded_div(value: i64, unit: i64) -> i64 {
    (value + unit / 2) / unit
}

impl Auction {
    /// Start an auction with no bids.
    #[must_use]
    pub fn new(
        item: impl Into<String>,
        item_id: Option<ItemId>,
        quantity: u64,
        value: Coins,
        starting_bid: Coins,
        auction_end: DateTime<Utc>,
        owner: Option<UserId>,
    ) -> Self {
        Self {
            item: item.into(),
            item_id,
            quantity,
            value,
            current_bid: starting_bid,
            current_highest_bidder: None,
            bids: Vec::new(),
            auction_end,
            owner,
            number_of_bids: 0,
        }
    }

    /// Record a bid.
    ///
    /// There is no deadline check: a bid that reaches the auction before
    /// its resolution runs is honored. Nothing is escrowed; `wallet` is
    /// only checked against `amount` at bid time.
    pub fn place_bid(
        &mut self,
        bidder: UserId,
        name: impl Into<String>,
        amount: Coins,
        wallet: Coins,
        now: DateTime<Utc>,
    ) -> Result<(), EconomyError> {
        if self.owner == Some(bidder) {
            return Err(EconomyError::SelfBid);
        }
        if wallet < amount {
            return Err(EconomyError::InsufficientFunds {
                available: wallet,
                required: amount,
            });
        }
        if amount <= self.current_bid {
            return Err(EconomyError::BidTooLow {
                current: self.current_bid,
            });
        }

        self.bids.push(Bid {
            bidder,
            name: name.into(),
            amount,
            placed_at: now,
        });
        self.number_of_bids += 1;
        self.current_bid = amount;
        self.current_highest_bidder = Some(bidder);
        Ok(())
    }

    #[must_use]
    pub fn time_left(&self, now: DateTime<Utc>) -> TimeLeft {
        let seconds = (self.auction_end - now).num_seconds();
        if seconds <= 0 {
            TimeLeft::Expired
        } else if seconds < 3_600 {
            TimeLeft::Minutes(rounded_div(seconds, 60))
        } else if seconds < 86_400 {
            TimeLeft::Hours(rounded_div(seconds, 3_600))
        } else {
            TimeLeft::Days(rounded_div(seconds, 86_400))
        }
    }

    /// Pick the winning bid.
    ///
    /// The highest bidder wins if they can pay. Otherwise, with more than
    /// one bid, the history is walked from the most recent bid backwards
    /// and the first bidder able to pay their own bid wins at that amount.
    /// Bidders missing from `users` cannot pay.
    fn winning_bid(&self, users: &BTreeMap<UserId, User>) -> Result<&Bid, UnsoldReason> {
        let affords = |bidder: &UserId, amount: Coins| {
            users.get(bidder).is_some_and(|user| user.can_afford(amount))
        };

        let Some(highest) = self.current_highest_bidder else {
            return Err(UnsoldReason::NoBids);
        };
        if self.number_of_bids == 0 || self.bids.is_empty() {
            return Err(UnsoldReason::NoBids);
        }

        if affords(&highest, self.current_bid) {
            if let Some(bid) = self.bids.iter().rev().find(|bid| bid.bidder == highest) {
                return Ok(bid);
            }
        }

        if self.bids.len() == 1 {
            return Err(UnsoldReason::HighestBidderShort);
        }

        self.bids
            .iter()
            .rev()
            .find(|bid| affords(&bid.bidder, bid.amount))
            .ok_or(UnsoldReason::NoAffordableBidder)
    }

    /// Settle the auction against the server's users.
    ///
    /// On a sale the winner pays and the owner, if any, is paid. The
    /// winner's inventory is left as is. Without a sale the items go back
    /// to the owner when there is one.
    pub fn settle(&self, users: &mut BTreeMap<UserId, User>) -> Settlement {
        match self.winning_bid(users) {
            Ok(bid) => {
                let (winner, winner_name, price) = (bid.bidder, bid.name.clone(), bid.amount);
                if let Some(user) = users.get_mut(&winner) {
                    if let Err(e) = user.debit(price) {
                        warn!(error = %e, winner = %winner, "Winner could not be debited");
                    }
                }
                if let Some(owner) = self.owner.and_then(|owner| users.get_mut(&owner)) {
                    owner.credit(price);
                }
                Settlement::Sold {
                    winner,
                    winner_name,
                    price,
                }
            }
            Err(reason) => Settlement::Unsold {
                reason,
                returned: self.return_to_owner(users),
            },
        }
    }

    fn return_to_owner(&self, users: &mut BTreeMap<UserId, User>) -> bool {
        let Some(owner_id) = self.owner else {
            return false;
        };
        let Some(owner) = users.get_mut(&owner_id) else {
            warn!(owner = %owner_id, item = %self.item, "Auction owner no longer exists");
            return false;
        };
        let Some(item_id) = self.item_id else {
            warn!(owner = %owner_id, item = %self.item, "Owned auction has no item id");
            return false;
        };
        owner.add_item(item_id, &self.item, self.quantity, self.value);
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    const SELLER: UserId = UserId::new(1);
    const ALICE: UserId = UserId::new(2);
    const BOB: UserId = UserId::new(3);

    fn users(wallets: &[(UserId, Coins)]) -> BTreeMap<UserId, User> {
        wallets
            .iter()
            .map(|(id, wallet)| (*id, User::new(id.to_string(), id.to_string(), *wallet)))
            .collect()
    }

    fn owned_auction() -> Auction {
        Auction::new(
            "Sword",
            Some(ItemId::new(9)),
            2,
            10,
            50,
            Utc::now() + Duration::minutes(5),
            Some(SELLER),
        )
    }

    #[test]
    fn bid_must_beat_the_current_bid() {
        let mut auction = owned_auction();
        let now = Utc::now();

        let err = auction.place_bid(ALICE, "Alice", 50, 500, now).unwrap_err();
        assert_eq!(err, EconomyError::BidTooLow { current: 50 });

        auction.place_bid(ALICE, "Alice", 51, 500, now).unwrap();
        assert_eq!(auction.current_bid, 51);
        assert_eq!(auction.current_highest_bidder, Some(ALICE));
        assert_eq!(auction.number_of_bids, 1);

        let err = auction.place_bid(BOB, "Bob", 51, 500, now).unwrap_err();
        assert_eq!(err, EconomyError::BidTooLow { current: 51 });
    }

    #[test]
    fn owner_cannot_bid() {
        let mut auction = owned_auction();
        let err = auction
            .place_bid(SELLER, "Seller", 100, 500, Utc::now())
            .unwrap_err();
        assert_eq!(err, EconomyError::SelfBid);
    }

    #[test]
    fn bid_beyond_wallet_is_rejected() {
        let mut auction = owned_auction();
        let err = auction.place_bid(ALICE, "Alice", 600, 500, Utc::now()).unwrap_err();
        assert!(matches!(err, EconomyError::InsufficientFunds { .. }));
    }

    #[test]
    fn no_bids_returns_items_to_owner() {
        let auction = owned_auction();
        let mut users = users(&[(SELLER, 0)]);

        let settlement = auction.settle(&mut users);
        assert_eq!(
            settlement,
            Settlement::Unsold {
                reason: UnsoldReason::NoBids,
                returned: true
            }
        );
        assert_eq!(users[&SELLER].inventory[&ItemId::new(9)].quantity, 2);
    }

    #[test]
    fn affordable_highest_bidder_pays_owner() {
        let mut auction = owned_auction();
        auction.place_bid(ALICE, "Alice", 100, 500, Utc::now()).unwrap();
        let mut users = users(&[(SELLER, 0), (ALICE, 500)]);

        let settlement = auction.settle(&mut users);
        assert_eq!(
            settlement,
            Settlement::Sold {
                winner: ALICE,
                winner_name: "Alice".into(),
                price: 100
            }
        );
        assert_eq!(users[&ALICE].wallet(), 400);
        assert_eq!(users[&SELLER].wallet(), 100);
        // the lot is not delivered to the winner
        assert!(users[&ALICE].inventory.is_empty());
    }

    #[test]
    fn single_unaffordable_bidder_returns_items() {
        let mut auction = owned_auction();
        auction.place_bid(ALICE, "Alice", 100, 500, Utc::now()).unwrap();
        let mut users = users(&[(SELLER, 0), (ALICE, 20)]);

        let settlement = auction.settle(&mut users);
        assert_eq!(
            settlement,
            Settlement::Unsold {
                reason: UnsoldReason::HighestBidderShort,
                returned: true
            }
        );
        assert_eq!(users[&ALICE].wallet(), 20);
        assert_eq!(users[&SELLER].inventory[&ItemId::new(9)].quantity, 2);
    }

    #[test]
    fn falls_back_to_most_recent_affordable_bid() {
        let mut auction = owned_auction();
        let now = Utc::now();
        auction.place_bid(BOB, "Bob", 60, 500, now).unwrap();
        auction.place_bid(ALICE, "Alice", 80, 500, now).unwrap();
        auction.place_bid(BOB, "Bob", 90, 500, now).unwrap();
        auction.place_bid(ALICE, "Alice", 300, 500, now).unwrap();

        // Alice spent her money elsewhere, Bob can still cover 60 but not 90
        let mut users = users(&[(SELLER, 0), (ALICE, 70), (BOB, 75)]);

        let settlement = auction.settle(&mut users);
        assert_eq!(
            settlement,
            Settlement::Sold {
                winner: BOB,
                winner_name: "Bob".into(),
                price: 60
            }
        );
        assert_eq!(users[&BOB].wallet(), 15);
        assert_eq!(users[&SELLER].wallet(), 60);
    }

    #[test]
    fn nobody_affordable_and_no_owner_vanishes() {
        let mut auction = owned_auction();
        auction.owner = None;
        let now = Utc::now();
        auction.place_bid(ALICE, "Alice", 60, 500, now).unwrap();
        auction.place_bid(BOB, "Bob", 70, 500, now).unwrap();
        let mut users = users(&[(ALICE, 10), (BOB, 10)]);

        let settlement = auction.settle(&mut users);
        assert_eq!(
            settlement,
            Settlement::Unsold {
                reason: UnsoldReason::NoAffordableBidder,
                returned: false
            }
        );
    }

    #[test]
    fn departed_bidder_cannot_pay() {
        let mut auction = owned_auction();
        auction.place_bid(ALICE, "Alice", 100, 500, Utc::now()).unwrap();
        let mut users = users(&[(SELLER, 0)]);

        assert!(matches!(
            auction.settle(&mut users),
            Settlement::Unsold { returned: true, .. }
        ));
    }

    #[test]
    fn time_left_buckets() {
        let now = Utc::now();
        let mut auction = owned_auction();

        auction.auction_end = now - Duration::seconds(1);
        assert_eq!(auction.time_left(now), TimeLeft::Expired);
        auction.auction_end = now + Duration::minutes(30);
        assert_eq!(auction.time_left(now), TimeLeft::Minutes(30));
        auction.auction_end = now + Duration::minutes(150);
        assert_eq!(auction.time_left(now), TimeLeft::Hours(3));
        auction.auction_end = now + Duration::days(2);
        assert_eq!(auction.time_left(now), TimeLeft::Days(2));
    }
}
