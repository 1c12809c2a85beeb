//! Telegram command front end.
//!
//! Chats subscribe with `/start` or `/receive`, unsubscribe with a second
//! `/receive`, and can ask for recent freebies at any time.

pub mod command;
pub mod handler;
pub mod poller;

pub use command::Command;
pub use handler::CommandHandler;
pub use poller::{start_bot_poller, BotPoller, UpdateSource};
