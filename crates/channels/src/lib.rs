//! Chat channels for the Shopwright admin bot.
//!
//! Each channel connects to a chat platform and relays operator messages
//! to the admin router and its replies back.
//!
//! Available channels:
//! - **CLI**: interactive terminal chat (stdin/stdout)
//! - **Telegram**: Telegram Bot API (stub, needs teloxide in production)

pub mod cli;
pub mod telegram;

pub use cli::CliChannel;
pub use telegram::TelegramChannel;
