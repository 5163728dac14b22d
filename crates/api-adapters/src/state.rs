use std::sync::Arc;

use domains::ports::{CatalogRepository, ContentRepository, UserRepository};
use secrecy::SecretString;
use services::{MarketplaceService, SitemapBuilder, SupportService, TelegramBot, UnsubscribeSigner};

/// Shared handles for every handler. Cloned per request, so everything
/// sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogRepository>,
    pub content: Arc<dyn ContentRepository>,
    pub users: Arc<dyn UserRepository>,
    pub marketplace: Arc<MarketplaceService>,
    pub support: Arc<SupportService>,
    pub sitemap: Arc<SitemapBuilder>,
    pub signer: Arc<UnsubscribeSigner>,
    /// `None` disables the webhook endpoint
    pub bot: Option<Arc<TelegramBot>>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`; `None` rejects every
    /// webhook call
    pub webhook_secret: Option<Arc<SecretString>>,
}
