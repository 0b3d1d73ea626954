//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys, bot tokens) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`.
//!
//! Filter thresholds and the blacklist are NOT here: they are mutable at
//! runtime and live in the state document (see `storage`). `[filters]`
//! only seeds that document on first start.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

use crate::engine::analyzer::{DEFAULT_RUG_PULL_THRESHOLD, DEFAULT_WINDOW_HOURS};
use crate::storage::DEFAULT_STATE_FILE;
use crate::types::{FilterConfig, TradeAction};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub poller: PollerConfig,
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollerConfig {
    pub name: String,
    pub update_interval_secs: u64,
    pub watchlist: Vec<String>,
    pub trade_amount: Decimal,
    #[serde(default = "default_trade_action")]
    pub trade_action: TradeAction,
}

fn default_trade_action() -> TradeAction {
    TradeAction::Buy
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointsConfig {
    pub dex_screener_api_url: String,
    pub pocket_universe_api_url: String,
    pub pocket_universe_api_key_env: String,
    pub rugcheck_api_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub database_url: String,
    pub state_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://rugscreen.db".into(),
            state_file: DEFAULT_STATE_FILE.into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzerConfig {
    pub window_hours: i64,
    pub rug_pull_threshold: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            window_hours: DEFAULT_WINDOW_HOURS,
            rug_pull_threshold: DEFAULT_RUG_PULL_THRESHOLD,
        }
    }
}

/// Env-var names for the Telegram bot. A missing token or alert chat
/// disables the channel; a missing trade chat falls back to the alert chat.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    pub bot_token_env: Option<String>,
    pub chat_id_env: Option<String>,
    pub trade_chat_id_env: Option<String>,
}

/// Telegram settings after env resolution.
#[derive(Debug)]
pub struct TelegramChannels {
    pub bot_token: Option<SecretString>,
    pub alert_chat: Option<String>,
    pub trade_chat: Option<String>,
}

impl TelegramConfig {
    pub fn resolve(&self) -> TelegramChannels {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve through `lookup` instead of the process environment.
    pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> TelegramChannels {
        let get = |env_name: &Option<String>| {
            env_name
                .as_deref()
                .and_then(&lookup)
                .filter(|v| !v.is_empty())
        };

        let alert_chat = get(&self.chat_id_env);
        TelegramChannels {
            bot_token: get(&self.bot_token_env).map(SecretString::new),
            trade_chat: get(&self.trade_chat_id_env).or_else(|| alert_chat.clone()),
            alert_chat,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub activity_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            activity_capacity: crate::activity::DEFAULT_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if config.poller.update_interval_secs == 0 {
            anyhow::bail!("poller.update_interval_secs must be greater than zero");
        }
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
