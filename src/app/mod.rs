//! Application layer: command parsing, economy services and the executor.

pub mod auction;
pub mod command;
pub mod executor;
pub mod ledger;
pub mod market;
mod orchestrator;
pub mod render;
pub mod settings;
pub mod shop;
pub mod timer;

pub use auction::{AuctionService, AuctionView, Resolution, Terms};
pub use command::{Command, CommandParseError};
pub use executor::{ChatHandle, Executor, InboundMessage, Job};
pub use ledger::{Ledger, Rewarded};
pub use market::{BetReceipt, Closed, Market, Position};
pub use orchestrator::App;
pub use settings::{HelpListing, SettingsService, ToggleReport};
pub use shop::{Receipt, Sale, ShopService};
pub use timer::AuctionTimers;
