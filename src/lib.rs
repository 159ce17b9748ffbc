//! Bazaar - a multi-server chat economy.
//!
//! Members of each chat server hold a coin wallet and an inventory. They
//! can bet on pari-mutuel predictions, buy and sell shop items, and bid in
//! timed auctions. Every server's data is partitioned by its id.
//!
//! # Architecture
//!
//! - [`domain`] - Records and rules. Synchronous and platform-agnostic.
//! - [`port`] - The `Store` and `Messenger` seams.
//! - [`adapter`] - JSON file and in-memory stores, console messenger.
//! - [`app`] - Command parsing, services and the single executor that
//!   serializes chat commands and auction deadlines.
//! - [`config`] - TOML configuration and logging setup.
//! - [`error`] - Crate error types.
//!
//! # Features
//!
//! - `testkit` - Test doubles such as `RecordingMessenger`.

pub mod adapter;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
