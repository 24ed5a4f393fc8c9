use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Upper bound for `ADMIN_SESSION_TTL_MINUTES` (30 days).
pub const MAX_SESSION_TTL_MINUTES: i64 = 30 * 24 * 60;

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
    pub notify_on_submit: bool,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub url: String,
    pub service_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub admin_password: Option<String>,
    pub admin_session_secret: Option<String>,
    pub admin_session_ttl_minutes: i64,
    pub storage: Option<StorageConfig>,
    pub max_upload_bytes: usize,
    pub smtp: Option<SmtpConfig>,
    pub telegram: Option<TelegramConfig>,
    pub google_script_webhook_url: Option<String>,
    pub site_url: String,
    pub seed_path: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let storage = match (var("STORAGE_URL"), var("STORAGE_SERVICE_KEY")) {
            (Some(url), Some(service_key)) => Some(StorageConfig {
                url,
                service_key,
                bucket: or_default(var("STORAGE_BUCKET"), "STORAGE_BUCKET", "business-images"),
            }),
            _ => {
                log::info!("STORAGE_URL or STORAGE_SERVICE_KEY not set, image upload disabled");
                None
            }
        };

        let smtp = match (var("SMTP_USER"), var("SMTP_PASS")) {
            (Some(user), Some(pass)) => Some(SmtpConfig {
                host: or_default(var("SMTP_HOST"), "SMTP_HOST", "smtp.hostinger.com"),
                port: parse_or(var("SMTP_PORT"), "SMTP_PORT", 465)?,
                user,
                pass,
            }),
            _ => {
                log::info!("SMTP_USER or SMTP_PASS not set, lucky-number emails disabled");
                None
            }
        };

        let telegram = match (var("TELEGRAM_BOT_TOKEN"), var("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                bot_token,
                chat_id,
                api_url: or_default(
                    var("TELEGRAM_API_URL"),
                    "TELEGRAM_API_URL",
                    "https://api.telegram.org",
                ),
                notify_on_submit: parse_or(
                    var("TELEGRAM_NOTIFY_ON_SUBMIT"),
                    "TELEGRAM_NOTIFY_ON_SUBMIT",
                    true,
                )?,
            }),
            _ => {
                log::info!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set, alerts disabled");
                None
            }
        };

        let admin_password = var("ADMIN_PASSWORD");
        if admin_password.is_none() {
            log::warn!("ADMIN_PASSWORD not set, admin routes will reject every request");
        }

        Ok(Self {
            host: or_default(var("HOST"), "HOST", "127.0.0.1"),
            port: parse_or(var("PORT"), "PORT", 8080)?,
            database_url,
            admin_password,
            admin_session_secret: var("ADMIN_SESSION_SECRET"),
            admin_session_ttl_minutes: session_ttl(var("ADMIN_SESSION_TTL_MINUTES"))?,
            storage,
            max_upload_bytes: parse_or(var("MAX_UPLOAD_BYTES"), "MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            smtp,
            telegram,
            google_script_webhook_url: var("GOOGLE_SCRIPT_WEBHOOK_URL"),
            site_url: or_default(var("SITE_URL"), "SITE_URL", "https://candiachi.com")
                .trim_end_matches('/')
                .to_string(),
            seed_path: or_default(var("SEED_PATH"), "SEED_PATH", "data/seed.json"),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn or_default(value: Option<String>, key: &str, default: &str) -> String {
    value.unwrap_or_else(|| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn session_ttl(value: Option<String>) -> Result<i64, ConfigError> {
    const KEY: &str = "ADMIN_SESSION_TTL_MINUTES";
    let minutes: i64 = parse_or(value, KEY, 720)?;
    if !(1..=MAX_SESSION_TTL_MINUTES).contains(&minutes) {
        return Err(ConfigError::Invalid {
            key: KEY,
            value: minutes.to_string(),
            reason: format!("must be between 1 and {MAX_SESSION_TTL_MINUTES}"),
        });
    }
    Ok(minutes)
}
