//! Telegram Bot API transport.
//!
//! One bot sends both operator alerts and trade commands. The trade
//! gateway bot in the chat reacts to `/{action} {address} {amount}`
//! messages, so both capabilities share `sendMessage`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::{Notifier, TradeExecutor};
use crate::types::{TradeAction, TradeOrder};

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramClient {
    http: Client,
    base_url: String,
    bot_token: SecretString,
}

impl TelegramClient {
    pub fn new(bot_token: SecretString, timeout_secs: u64) -> Result<Self> {
        Self::with_base_url(bot_token, API_BASE, timeout_secs)
    }

    pub fn with_base_url(
        bot_token: SecretString,
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            http: super::http_client(timeout_secs)?,
            base_url: base_url.into(),
            bot_token,
        })
    }

    /// Send a plain-text message to `chat_id`.
    ///
    /// The token is part of the request path, so transport errors are
    /// stripped of their URL before they reach the activity log.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.base_url.trim_end_matches('/'),
            self.bot_token.expose_secret()
        );

        let resp = self
            .http
            .post(&url)
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Telegram request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error {status}: {body}");
        }

        debug!(chat_id, "Telegram message sent");
        Ok(())
    }
}

/// Alert capability bound to the operator chat.
pub struct TelegramNotifier {
    client: Arc<TelegramClient>,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: Arc<TelegramClient>, chat_id: impl Into<String>) -> Self {
        Self {
            client,
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.client.send_message(&self.chat_id, text).await
    }
}

/// Trade capability bound to the chat the trade bot listens on.
pub struct TelegramTradeExecutor {
    client: Arc<TelegramClient>,
    chat_id: String,
}

impl TelegramTradeExecutor {
    pub fn new(client: Arc<TelegramClient>, chat_id: impl Into<String>) -> Self {
        Self {
            client,
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl TradeExecutor for TelegramTradeExecutor {
    async fn execute(&self, action: TradeAction, address: &str, amount: Decimal) -> Result<()> {
        let command = TradeOrder {
            action,
            address: address.to_string(),
            amount,
        }
        .command();
        self.client.send_message(&self.chat_id, &command).await
    }
}

/// Used when Telegram is not configured: alerts go to the log only.
pub struct LogOnlyNotifier;

#[async_trait]
impl Notifier for LogOnlyNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        tracing::info!(text, "[NO TELEGRAM] Alert");
        Ok(())
    }
}

/// Used when Telegram is not configured: trades are logged, never sent.
pub struct DryRunTradeExecutor;

#[async_trait]
impl TradeExecutor for DryRunTradeExecutor {
    async fn execute(&self, action: TradeAction, address: &str, amount: Decimal) -> Result<()> {
        tracing::info!(%action, address, %amount, "[DRY RUN] Would dispatch trade");
        Ok(())
    }
}
