//! Shared types for the RUGSCREEN agent.
//!
//! These types form the data model used across all modules: the raw
//! market-data payload, the canonical `TokenRecord`, the mutable filter
//! and blacklist state, and the screening `Decision`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Raw market-data payload (DexScreener shape)
// ---------------------------------------------------------------------------

/// Raw `/latest/dex/tokens/{address}` response. Every field is optional;
/// the normalizer decides what a usable payload looks like.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPayload {
    #[serde(default)]
    pub pairs: Option<Vec<RawPair>>,
}

/// One liquidity-pool listing for a token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPair {
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub base_token: Option<RawBaseToken>,
    /// DexScreener reports prices as decimal strings.
    #[serde(default)]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub volume: Option<RawVolume>,
    #[serde(default)]
    pub liquidity: Option<RawLiquidity>,
    /// Fully diluted valuation, used as market cap.
    #[serde(default)]
    pub fdv: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBaseToken {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dev_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawVolume {
    #[serde(default)]
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLiquidity {
    #[serde(default)]
    pub usd: Option<f64>,
}

// ---------------------------------------------------------------------------
// Token record
// ---------------------------------------------------------------------------

/// One observation of a token, produced by the normalizer.
/// Immutable once persisted to the metrics store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub timestamp: DateTime<Utc>,
    pub token_address: String,
    pub token_name: Option<String>,
    pub price_usd: Option<f64>,
    pub volume_24h: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub chain: Option<String>,
    pub dev_address: Option<String>,
}

impl TokenRecord {
    /// Name for alerts, falling back to the address.
    pub fn display_name(&self) -> &str {
        self.token_name.as_deref().unwrap_or(&self.token_address)
    }

    /// Helper to build a test record with sensible defaults.
    #[cfg(test)]
    pub fn sample(address: &str) -> Self {
        TokenRecord {
            timestamp: Utc::now(),
            token_address: address.to_string(),
            token_name: Some("Sample Token".to_string()),
            price_usd: Some(1.0),
            volume_24h: Some(120_000.0),
            liquidity_usd: Some(50_000.0),
            market_cap_usd: Some(2_500_000.0),
            chain: Some("solana".to_string()),
            dev_address: Some(format!("dev-{address}")),
        }
    }
}

impl fmt::Display for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num = |v: Option<f64>| v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "n/a".into());
        write!(
            f,
            "[{}] {} ({}) price: ${} | liq: ${} | vol24h: ${}",
            self.chain.as_deref().unwrap_or("?"),
            self.display_name(),
            self.token_address,
            self.price_usd.map(|p| p.to_string()).unwrap_or_else(|| "n/a".into()),
            num(self.liquidity_usd),
            num(self.volume_24h),
        )
    }
}

// ---------------------------------------------------------------------------
// Filter configuration and blacklist
// ---------------------------------------------------------------------------

/// Screening thresholds. Unknown keys are carried through untouched so a
/// full-replace update never drops fields this version does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub min_liquidity_usd: f64,
    /// Fractional change, e.g. 0.10 for 10%.
    pub max_price_change_24h: f64,
    /// Percentage points, e.g. 5.0 for 5%.
    pub max_fake_volume_percentage: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_liquidity_usd: 10_000.0,
            max_price_change_24h: 0.10,
            max_fake_volume_percentage: 5.0,
            extra: serde_json::Map::new(),
        }
    }
}

/// Which blacklist set an address is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Coin,
    Dev,
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::Coin => write!(f, "Token"),
            ListKind::Dev => write!(f, "Dev"),
        }
    }
}

/// Banned token and developer addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blacklist {
    #[serde(default)]
    pub coins: BTreeSet<String>,
    #[serde(default)]
    pub devs: BTreeSet<String>,
}

impl Blacklist {
    pub fn contains(&self, kind: ListKind, address: &str) -> bool {
        match kind {
            ListKind::Coin => self.coins.contains(address),
            ListKind::Dev => self.devs.contains(address),
        }
    }

    /// Insert a token and (optionally) its developer.
    /// Returns `true` if either set changed.
    pub fn insert(&mut self, token_address: &str, dev_address: Option<&str>) -> bool {
        let mut changed = self.coins.insert(token_address.to_string());
        if let Some(dev) = dev_address {
            changed |= self.devs.insert(dev.to_string());
        }
        changed
    }
}

/// The durable, mutable document behind the config store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub filters: FilterConfig,
    #[serde(default)]
    pub blacklist: Blacklist,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Collaborator results
// ---------------------------------------------------------------------------

/// Reputation verdict for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reputation {
    pub is_good: bool,
    pub is_bundled: bool,
}

/// Trade command verb sent to the trade gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "buy"),
            TradeAction::Sell => write!(f, "sell"),
        }
    }
}

/// A trade the poller should dispatch after an accept.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOrder {
    pub action: TradeAction,
    pub address: String,
    pub amount: Decimal,
}

impl TradeOrder {
    /// The `/{action} {address} {amount}` command understood by the gateway.
    pub fn command(&self) -> String {
        format!("/{} {} {}", self.action, self.address, self.amount)
    }
}

// ---------------------------------------------------------------------------
// Screening decision
// ---------------------------------------------------------------------------

/// Why a filter stage rejected a token.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    LowLiquidity { liquidity_usd: Option<f64>, min: f64 },
    HighVolatility { price_change: f64, max: f64 },
    FakeVolume { percentage: f64, max: f64 },
}

/// Which blacklist entry matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistHit {
    pub kind: ListKind,
    pub address: String,
}

/// Outcome of one screening run. Side effects are described, not performed.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Persist the record, send the success alert, dispatch the trade.
    Accept { record: TokenRecord, trade: TradeOrder },
    RejectFilter { address: String, reason: RejectReason },
    RejectBlacklisted(BlacklistHit),
    /// Bundled supply: ban the watched address and the record's dev, send
    /// the blacklist alert.
    Blacklist { address: String, record: TokenRecord },
    /// Reputation neither good nor bundled. Silently skipped.
    Unrated { address: String },
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Accept { .. } => "accept",
            Decision::RejectFilter { .. } => "reject_filter",
            Decision::RejectBlacklisted(_) => "reject_blacklisted",
            Decision::Blacklist { .. } => "blacklist",
            Decision::Unrated { .. } => "unrated",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Accept { trade, .. } => {
                write!(f, "Token {} passed all filters.", trade.address)
            }
            Decision::RejectFilter { address, reason } => match reason {
                RejectReason::LowLiquidity { .. } => {
                    write!(f, "Token {address} has low liquidity.")
                }
                RejectReason::HighVolatility { .. } => {
                    write!(f, "Token {address} has high price volatility.")
                }
                RejectReason::FakeVolume { .. } => {
                    write!(f, "Token {address} has high fake volume and is excluded.")
                }
            },
            Decision::RejectBlacklisted(hit) => {
                write!(f, "{} {} is blacklisted.", hit.kind, hit.address)
            }
            Decision::Blacklist { address, .. } => {
                write!(f, "Token {address} has bundled supply.")
            }
            Decision::Unrated { address } => {
                write!(f, "Token {address} has no conclusive reputation.")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
