//! Remote collaborators.
//!
//! Defines the capability traits the screening engine consumes and
//! provides HTTP implementations for:
//! - DexScreener: market data
//! - Pocket Universe: fake-volume detection
//! - RugCheck: reputation / bundled-supply check
//! - Telegram: alerts and trade commands (one transport, two capabilities)

pub mod dexscreener;
pub mod pocket_universe;
pub mod rugcheck;
pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::ScreenError;
use crate::types::{RawPayload, Reputation, TradeAction};

/// Source of raw market data for a token address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    async fn fetch(&self, address: &str) -> Result<RawPayload, ScreenError>;
}

/// Remote wash-trading heuristic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScamDetectionClient: Send + Sync {
    /// Percentage (0–100) of reported volume judged fake.
    async fn analyze(&self, address: &str) -> Result<f64, ScreenError>;
}

/// Remote reputation service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReputationClient: Send + Sync {
    async fn check(&self, address: &str) -> Result<Reputation, ScreenError>;
}

/// Best-effort operator alerts. Failures are logged by the caller and
/// never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Fire-and-forget trade dispatch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    async fn execute(&self, action: TradeAction, address: &str, amount: Decimal) -> Result<()>;
}

/// Shared HTTP client builder so every collaborator gets the same
/// timeout and user agent.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    use anyhow::Context;

    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent("RUGSCREEN/0.1.0 (token-screening-agent)")
        .build()
        .context("Failed to build HTTP client")
}
