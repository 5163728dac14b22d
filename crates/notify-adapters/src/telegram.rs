//! Telegram Bot API over HTTPS.
//!
//! Every method is a JSON `POST {api_base}/bot{token}/{method}` answered
//! with the `{ ok, result, description }` envelope. Failures surface as
//! `DomainError::External` carrying Telegram's description.

use std::time::Duration;

use async_trait::async_trait;
use domains::errors::{DomainError, Result};
use domains::models::{BotCommandSpec, BotUpdate};
use domains::ports::TelegramApi;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

/// Slack on top of the long-polling timeout before reqwest gives up.
const REQUEST_MARGIN: Duration = Duration::from_secs(10);
const MAX_POLL_TIMEOUT_SECS: u64 = 50;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    chat: WireChat,
    from: Option<WireUser>,
    text: Option<String>,
}

/// An `Update` object as Telegram sends it, to `getUpdates` callers and
/// to webhooks alike. Only the fields the bot reads are kept.
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    update_id: i64,
    message: Option<WireMessage>,
    edited_message: Option<WireMessage>,
}

impl TelegramUpdate {
    /// Updates without a message (callbacks, polls, ...) keep their id so
    /// the offset still moves past them, with `chat_id` 0 and no text.
    pub fn into_bot_update(self) -> BotUpdate {
        match self.message.or(self.edited_message) {
            Some(message) => BotUpdate {
                update_id: self.update_id,
                chat_id: message.chat.id,
                username: message.from.and_then(|u| u.username),
                text: message.text,
            },
            None => BotUpdate {
                update_id: self.update_id,
                chat_id: 0,
                username: None,
                text: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 2],
}

pub struct TelegramHttpClient {
    http: reqwest::Client,
    api_base: String,
    token: SecretString,
}

impl TelegramHttpClient {
    pub fn new(api_base: &str, token: SecretString) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("prochepro-bot/0.1")
            .timeout(Duration::from_secs(MAX_POLL_TIMEOUT_SECS) + REQUEST_MARGIN)
            .build()
            .map_err(|e| DomainError::Internal(format!("telegram client: {e}")))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/bot{}/{method}", self.api_base, self.token.expose_secret());
        // reqwest errors embed the URL, which embeds the token
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| DomainError::External(format!("telegram {method}: {}", e.without_url())))?;
        let status = response.status();
        let envelope = response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| DomainError::External(format!("telegram {method} ({status}): {}", e.without_url())))?;

        match envelope {
            Envelope { ok: true, result: Some(result), .. } => Ok(result),
            Envelope { description, .. } => Err(DomainError::External(format!(
                "telegram {method} ({status}): {}",
                description.unwrap_or_else(|| "no description".into())
            ))),
        }
    }
}

#[async_trait]
impl TelegramApi for TelegramHttpClient {
    #[instrument(skip(self))]
    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<BotUpdate>> {
        let body = GetUpdates {
            offset,
            timeout: timeout_secs.min(MAX_POLL_TIMEOUT_SECS),
            allowed_updates: ["message", "edited_message"],
        };
        let updates: Vec<TelegramUpdate> = self.call("getUpdates", &body).await?;
        debug!(count = updates.len(), "updates received");
        Ok(updates.into_iter().map(TelegramUpdate::into_bot_update).collect())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        let _: serde_json::Value = self.call("sendMessage", &body).await?;
        Ok(())
    }

    async fn set_webhook(&self, url: &str, secret_token: Option<String>) -> Result<()> {
        let mut body = json!({
            "url": url,
            "allowed_updates": ["message", "edited_message"],
        });
        if let Some(secret) = secret_token {
            body["secret_token"] = json!(secret);
        }
        let _: bool = self.call("setWebhook", &body).await?;
        Ok(())
    }

    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<()> {
        let _: bool = self
            .call("deleteWebhook", &json!({ "drop_pending_updates": drop_pending_updates }))
            .await?;
        Ok(())
    }

    async fn set_my_commands(&self, commands: &[BotCommandSpec]) -> Result<()> {
        let _: bool = self.call("setMyCommands", &json!({ "commands": commands })).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123:abc";

    fn client(server: &MockServer) -> TelegramHttpClient {
        TelegramHttpClient::new(&server.uri(), SecretString::from(TOKEN)).unwrap()
    }

    #[test]
    fn update_without_message_keeps_its_id() {
        let update: TelegramUpdate =
            serde_json::from_value(json!({ "update_id": 9, "callback_query": { "id": "x" } })).unwrap();
        let update = update.into_bot_update();
        assert_eq!(update.update_id, 9);
        assert!(update.text.is_none());
    }

    #[tokio::test]
    async fn test_get_updates_unwraps_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/getUpdates")))
            .and(body_partial_json(json!({ "offset": 41, "timeout": 25 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [
                    {
                        "update_id": 41,
                        "message": {
                            "message_id": 1,
                            "chat": { "id": 777, "type": "private" },
                            "from": { "id": 5, "is_bot": false, "first_name": "Léa", "username": "lea" },
                            "text": "/tasks Lyon"
                        }
                    },
                    { "update_id": 42, "message": { "message_id": 2, "chat": { "id": 778 } } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let updates = client(&server).get_updates(Some(41), 25).await.unwrap();

        assert_eq!(
            updates[0],
            BotUpdate {
                update_id: 41,
                chat_id: 777,
                username: Some("lea".into()),
                text: Some("/tasks Lyon".into()),
            }
        );
        assert_eq!(updates[1].chat_id, 778);
        assert!(updates[1].text.is_none());
    }

    #[tokio::test]
    async fn test_api_errors_carry_the_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/sendMessage")))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            })))
            .mount(&server)
            .await;

        let err = client(&server).send_message(1, "salut").await.unwrap_err();
        match err {
            DomainError::External(msg) => {
                assert!(msg.contains("blocked by the user"));
                assert!(!msg.contains(TOKEN));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_set_webhook_sends_secret_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/setWebhook")))
            .and(body_partial_json(json!({
                "url": "https://prochepro.fr/api/telegram/webhook",
                "secret_token": "s3cret"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": true })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .set_webhook("https://prochepro.fr/api/telegram/webhook", Some("s3cret".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_set_my_commands_posts_the_menu() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/setMyCommands")))
            .and(body_partial_json(json!({
                "commands": [{ "command": "start", "description": "Démarrer" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": true })))
            .expect(1)
            .mount(&server)
            .await;

        let menu = [BotCommandSpec {
            command: "start".into(),
            description: "Démarrer".into(),
        }];
        client(&server).set_my_commands(&menu).await.unwrap();
    }
}
