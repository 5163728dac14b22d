//! # api-adapters
//!
//! The axum HTTP surface: public content (sitemap, blog, SEO pages, open
//! tasks), the support chat endpoints polled by the widget, the signed
//! unsubscribe link and the Telegram webhook.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
