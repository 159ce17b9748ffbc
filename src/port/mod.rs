//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! # Available Ports
//!
//! - [`Store`] - Whole-domain document persistence
//! - [`Messenger`] - Chat platform: replies, roster and permissions

mod messenger;
mod store;

pub use messenger::{Field, Messenger, Reply, RichMessage};
pub use store::{Document, Domain, Store};
