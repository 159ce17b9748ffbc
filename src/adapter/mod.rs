//! Implementations of ports (hexagonal adapters).

pub mod messenger;
pub mod store;
