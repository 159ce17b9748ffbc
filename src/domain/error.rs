//! Economy rule violations.
//!
//! Every variant is raised before any state is saved, so a failed
//! operation leaves the store untouched. The `Display` text is what the
//! caller sees in chat.

use std::fmt;

use thiserror::Error;

use super::money::Coins;

/// Errors raised by the economy rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// Malformed arguments or a rule the request breaks.
    #[error("{message}")]
    Validation { message: String },

    #[error("{what} not found.")]
    NotFound { what: String },

    #[error("You do not have enough money in your wallet (balance ${available}, needed ${required}).")]
    InsufficientFunds { available: Coins, required: Coins },

    #[error("You do not have {required} {item} (you own {available}).")]
    InsufficientInventory {
        item: String,
        available: u64,
        required: u64,
    },

    #[error("There are not enough {item} in stock.")]
    OutOfStock { item: String },

    #[error("Your bid needs to be higher than the current highest bid of ${current}.")]
    BidTooLow { current: Coins },

    #[error("You can not bid on your own auction.")]
    SelfBid,

    #[error("You can't bet on an option you are already betting against.")]
    OptionConflict,

    #[error("Betting on {title} is currently closed.")]
    PredictionClosed { title: String },

    #[error("A prediction titled {title} already exists.")]
    DuplicateTitle { title: String },

    #[error("{name} already exists in the shop.")]
    DuplicateItem { name: String },

    #[error("Auction {id} does not exist or has already ended.")]
    AuctionNotFound { id: String },

    #[error("The chat platform is unavailable: {0}")]
    CollaboratorUnavailable(String),
}

impl EconomyError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// A command whose arguments do not parse, with the usage hint.
    pub fn syntax(usage: impl fmt::Display) -> Self {
        Self::validation(format!("Invalid syntax. {usage}"))
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}
