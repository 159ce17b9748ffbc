//! Platform-agnostic economy domain: records, rules and state transitions.
//!
//! Everything here is synchronous and operates on documents already
//! loaded from the store. Services in [`crate::app`] own the
//! load-mutate-save cycle.

mod auction;
mod error;
mod ids;
mod money;
mod prediction;
mod rules;
mod settings;
mod shop;
mod state;
mod user;

pub use auction::{Auction, Bid, Settlement, TimeLeft, UnsoldReason};
pub use error::EconomyError;
pub use ids::{AuctionId, ChannelId, ItemId, PredictionId, Selector, ServerId, UserId};
pub use money::{checked_total, round_coins, Coins, Price, Restock, Stock};
pub use prediction::{
    Loser, OptionNumber, OptionSummary, PayoutReport, Prediction, ServerPredictions, UserBet,
    Winner,
};
pub use rules::EconomyRules;
pub use settings::{
    CommandAccess, ServerSettings, ToggleOutcome, PRIVILEGED_COMMANDS, TOGGLE_COMMAND,
    USER_COMMANDS,
};
pub use shop::{EditReport, Lot, Purchase, ServerShop, ShopItem, StockStatus, EDITABLE_ATTRIBUTES};
pub use state::{
    Partitioned, PredictionsDoc, ServerUsers, SettingsDoc, ShopDoc, UsersDoc,
};
pub use user::{BetStats, Inventory, InventoryEntry, User};
