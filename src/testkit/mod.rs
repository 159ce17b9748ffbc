//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`messenger`] - [`RecordingMessenger`], an in-memory chat platform.

pub mod messenger;

pub use messenger::{Delivery, RecordingMessenger};
