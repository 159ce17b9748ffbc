//! Messenger adapters.

mod console;

pub use console::{render_rich, ConsoleMessenger};
