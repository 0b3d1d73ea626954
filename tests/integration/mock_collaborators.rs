//! In-memory collaborators for integration testing.
//!
//! Deterministic stand-ins for the market-data, scam-detection,
//! reputation, notification and trade services. Every call is recorded
//! so tests can assert on exactly what was (or was not) contacted.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rugscreen::clients::{
    MarketDataClient, Notifier, ReputationClient, ScamDetectionClient, TradeExecutor,
};
use rugscreen::error::ScreenError;
use rugscreen::types::{
    RawBaseToken, RawLiquidity, RawPair, RawPayload, RawVolume, Reputation, TradeAction,
};

/// Build a single-pair payload the way DexScreener shapes it.
pub fn pair_payload(address: &str, name: &str, price: &str, liquidity_usd: f64) -> RawPayload {
    RawPayload {
        pairs: Some(vec![RawPair {
            chain_id: Some("solana".into()),
            base_token: Some(RawBaseToken {
                address: Some(address.into()),
                name: Some(name.into()),
                dev_address: Some(format!("dev-{address}")),
            }),
            price_usd: Some(price.into()),
            volume: Some(RawVolume { h24: Some(125_000.0) }),
            liquidity: Some(RawLiquidity { usd: Some(liquidity_usd) }),
            fdv: Some(2_000_000.0),
        }]),
    }
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedMarket {
    payloads: Mutex<HashMap<String, RawPayload>>,
    offline: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedMarket {
    pub fn serve(&self, address: &str, payload: RawPayload) {
        self.payloads.lock().unwrap().insert(address.to_string(), payload);
    }

    /// Every fetch for `address` fails with a transport error.
    pub fn take_offline(&self, address: &str) {
        self.offline.lock().unwrap().insert(address.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataClient for ScriptedMarket {
    async fn fetch(&self, address: &str) -> Result<RawPayload, ScreenError> {
        self.calls.lock().unwrap().push(address.to_string());
        if self.offline.lock().unwrap().contains(address) {
            return Err(ScreenError::transport("dexscreener", "HTTP 503 Service Unavailable"));
        }
        self.payloads
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| ScreenError::transport("dexscreener", "HTTP 404 Not Found"))
    }
}

// ---------------------------------------------------------------------------
// Scam detection / reputation
// ---------------------------------------------------------------------------

pub struct FixedScamDetector {
    pub fake_volume_percentage: f64,
    calls: AtomicUsize,
}

impl FixedScamDetector {
    pub fn new(fake_volume_percentage: f64) -> Self {
        Self {
            fake_volume_percentage,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScamDetectionClient for FixedScamDetector {
    async fn analyze(&self, _address: &str) -> Result<f64, ScreenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.fake_volume_percentage)
    }
}

pub struct FixedReputation {
    pub reputation: Reputation,
    calls: AtomicUsize,
}

impl FixedReputation {
    pub fn new(is_good: bool, is_bundled: bool) -> Self {
        Self {
            reputation: Reputation { is_good, is_bundled },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReputationClient for FixedReputation {
    async fn check(&self, _address: &str) -> Result<Reputation, ScreenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reputation)
    }
}

// ---------------------------------------------------------------------------
// Notifications / trades
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    failing: bool,
}

impl RecordingNotifier {
    /// Records the message, then reports a delivery failure.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        if self.failing {
            return Err(anyhow!("Telegram API error 502"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingTrader {
    orders: Mutex<Vec<(TradeAction, String, Decimal)>>,
}

impl RecordingTrader {
    pub fn orders(&self) -> Vec<(TradeAction, String, Decimal)> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeExecutor for RecordingTrader {
    async fn execute(&self, action: TradeAction, address: &str, amount: Decimal) -> Result<()> {
        self.orders
            .lock()
            .unwrap()
            .push((action, address.to_string(), amount));
        Ok(())
    }
}
