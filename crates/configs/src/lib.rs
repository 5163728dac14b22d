//! # configs
//!
//! Layered application settings:
//! built-in defaults < `config/default.toml` < `config/{PROCHEPRO_ENV}.toml`
//! < `PROCHEPRO__SECTION__KEY` environment variables. A `.env` file is loaded
//! first so its values reach the environment layer.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Placeholder `app.key`, only accepted when `app.env` is `development`.
pub const DEV_APP_KEY: &str = "change-me";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: AppSettings,
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub log: LogSettings,
    pub email: EmailSettings,
    pub telegram: TelegramSettings,
    pub content: ContentSettings,
    pub marketplace: MarketplaceSettings,
}

#[derive(Debug, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub env: String,
    /// Public site origin used in sitemap and email links, without trailing slash
    pub base_url: String,
    /// Signs unsubscribe tokens
    #[serde(deserialize_with = "secret")]
    pub key: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Emails are written to the log only
    Log,
    /// JSON POST to a transactional mail API
    Http,
}

#[derive(Debug, Deserialize)]
pub struct EmailSettings {
    pub transport: MailTransport,
    pub api_url: Option<String>,
    #[serde(default, deserialize_with = "opt_secret")]
    pub api_key: Option<SecretString>,
    pub from_address: String,
    pub from_name: String,
    /// UTC hour at which weekly digests are scheduled on Mondays
    pub digest_hour: u32,
    /// Max entries drained by one `email:send-scheduled` run
    pub batch_size: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramSettings {
    #[serde(default, deserialize_with = "opt_secret")]
    pub bot_token: Option<SecretString>,
    pub api_base: String,
    pub poll_interval_secs: u64,
    /// Long-polling timeout passed to `getUpdates`
    pub poll_timeout_secs: u64,
    #[serde(default, deserialize_with = "opt_secret")]
    pub webhook_secret: Option<SecretString>,
    /// Chat that receives new support tickets
    pub admin_chat_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ContentSettings {
    pub sitemap_path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct MarketplaceSettings {
    pub offer_credit_cost: i32,
    pub signup_credits: i32,
    /// Default age threshold for `tasks:cleanup-generated`
    pub generated_task_ttl_days: i64,
}

fn secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn opt_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.is_empty())
        .map(SecretString::from))
}

impl Settings {
    /// Loads `.env`, then the layered sources from the current directory.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
        }
        let env = std::env::var("PROCHEPRO_ENV").unwrap_or_else(|_| "development".to_string());
        Self::build(Path::new("config"), &env, true)
    }

    /// Loads defaults plus `{dir}/default.toml` and `{dir}/{env}.toml`,
    /// optionally followed by environment variables.
    pub fn build(dir: &Path, env: &str, with_env_vars: bool) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("app.name", "ProchePro")?
            .set_default("app.env", env)?
            .set_default("app.base_url", "http://localhost:3000")?
            .set_default("app.key", DEV_APP_KEY)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://prochepro.db")?
            .set_default("database.max_connections", 5)?
            .set_default("log.level", "info")?
            .set_default("log.format", "pretty")?
            .set_default("email.transport", "log")?
            .set_default("email.from_address", "bonjour@prochepro.fr")?
            .set_default("email.from_name", "ProchePro")?
            .set_default("email.digest_hour", 8)?
            .set_default("email.batch_size", 100)?
            .set_default("telegram.api_base", "https://api.telegram.org")?
            .set_default("telegram.poll_interval_secs", 2)?
            .set_default("telegram.poll_timeout_secs", 25)?
            .set_default("content.sitemap_path", "public/sitemap.xml")?
            .set_default("marketplace.offer_credit_cost", 1)?
            .set_default("marketplace.signup_credits", 5)?
            .set_default("marketplace.generated_task_ttl_days", 14)?
            .add_source(File::from(dir.join("default.toml")).required(false))
            .add_source(File::from(dir.join(format!("{env}.toml"))).required(false));

        if with_env_vars {
            builder = builder.add_source(
                Environment::with_prefix("PROCHEPRO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.app.env != "development" && self.app.key.expose_secret() == DEV_APP_KEY {
            return Err(ConfigError::Invalid(format!(
                "app.key must be set outside development (env = {})",
                self.app.env
            )));
        }
        if self.app.base_url.ends_with('/') {
            return Err(ConfigError::Invalid("app.base_url must not end with '/'".into()));
        }
        if self.email.digest_hour > 23 {
            return Err(ConfigError::Invalid("email.digest_hour must be 0-23".into()));
        }
        if self.email.transport == MailTransport::Http && self.email.api_url.is_none() {
            return Err(ConfigError::Invalid(
                "email.api_url is required with the http transport".into(),
            ));
        }
        if self.marketplace.offer_credit_cost < 0 {
            return Err(ConfigError::Invalid("marketplace.offer_credit_cost must be >= 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_load_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::build(dir.path(), "development", false).unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.log.format, LogFormat::Pretty);
        assert_eq!(settings.email.transport, MailTransport::Log);
        assert!(settings.telegram.bot_token.is_none());
        assert_eq!(settings.marketplace.offer_credit_cost, 1);
    }

    #[test]
    fn environment_file_overrides_default_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            "[app]\nbase_url = \"https://prochepro.fr\"\nkey = \"prod-key\"\n[telegram]\nbot_token = \"123:abc\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("production.toml"), "[log]\nformat = \"json\"\n").unwrap();

        let settings = Settings::build(dir.path(), "production", false).unwrap();

        assert_eq!(settings.app.base_url, "https://prochepro.fr");
        assert_eq!(settings.app.env, "production");
        assert_eq!(settings.log.format, LogFormat::Json);
        assert_eq!(
            settings.telegram.bot_token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("123:abc".to_string())
        );
    }

    #[test]
    fn http_transport_requires_api_url() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("default.toml"), "[email]\ntransport = \"http\"\n").unwrap();

        let err = Settings::build(dir.path(), "development", false).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn trailing_slash_in_base_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("default.toml"), "[app]\nbase_url = \"https://x.fr/\"\n").unwrap();
        assert!(Settings::build(dir.path(), "development", false).is_err());
    }

    #[test]
    fn placeholder_app_key_is_rejected_outside_development() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::build(dir.path(), "production", false).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("app.key")));

        fs::write(dir.path().join("production.toml"), "[app]\nkey = \"s3cret-signing-key\"\n").unwrap();
        let settings = Settings::build(dir.path(), "production", false).unwrap();
        assert_eq!(settings.app.key.expose_secret(), "s3cret-signing-key");
    }
}
