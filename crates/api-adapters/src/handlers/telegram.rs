//! Webhook mode of the bot. Telegram retries any non-2xx answer, so
//! failures while answering are logged and acknowledged anyway.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use domains::errors::DomainError;
use notify_adapters::TelegramUpdate;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::error::ApiResult;
use crate::state::AppState;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<TelegramUpdate>,
) -> ApiResult<Json<Value>> {
    let Some(bot) = &state.bot else {
        return Err(DomainError::not_found("Webhook", "telegram").into());
    };
    let Some(expected) = &state.webhook_secret else {
        warn!("telegram webhook called but no secret is configured");
        return Err(DomainError::Forbidden("webhook secret not configured".into()).into());
    };
    let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if provided != Some(expected.expose_secret()) {
        warn!("telegram webhook called with a bad secret token");
        return Err(DomainError::Forbidden("invalid webhook secret".into()).into());
    }

    let update = update.into_bot_update();
    if let Err(e) = bot.handle_update(&update).await {
        error!(update_id = update.update_id, error = %e, "webhook update failed");
    }
    Ok(Json(json!({ "ok": true })))
}
