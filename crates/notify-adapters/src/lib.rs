//! # notify-adapters
//!
//! Outbound channels: the Telegram Bot HTTP API behind `TelegramApi` and
//! the `Mailer` transports (HTTP JSON API or log only).

pub mod mail;
pub mod telegram;

pub use mail::{HttpMailer, LogMailer};
pub use telegram::{TelegramHttpClient, TelegramUpdate};
