//! Bot-facing types, independent of the Telegram wire format.

use serde::{Deserialize, Serialize};

/// An incoming text message, already unwrapped from the Bot API envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotUpdate {
    pub update_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    /// `None` for stickers, photos and other non-text updates
    pub text: Option<String>,
}

/// Entry of the command menu published with `setMyCommands`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommandSpec {
    pub command: String,
    pub description: String,
}
