//! # services
//!
//! Use cases of the ProchePro backend. Every service holds `Arc<dyn Port>`
//! handles from `domains` and is wired by the binaries; nothing here knows
//! about SQL, HTTP or the Telegram wire format.

pub mod content;
pub mod demo;
pub mod email;
pub mod marketplace;
pub mod sitemap;
pub mod slug;
pub mod support;
pub mod telegram;

pub use content::{ContentGenerator, GenerateOptions, GenerationReport};
pub use demo::DemoSeeder;
pub use email::{EmailDispatcher, EmailRenderer, EmailScheduler, UnsubscribeSigner};
pub use marketplace::MarketplaceService;
pub use sitemap::SitemapBuilder;
pub use slug::slugify;
pub use support::SupportService;
pub use telegram::TelegramBot;
