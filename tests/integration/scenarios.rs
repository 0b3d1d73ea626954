//! End-to-end screening scenarios.
//!
//! Each test wires the real pipeline, registry, SQLite metrics store and
//! state document to the in-memory collaborators, then drives one or more
//! poller cycles.

use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal_macros::dec;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rugscreen::activity::ActivityLog;
use rugscreen::engine::analyzer::PatternAnalyzer;
use rugscreen::engine::pipeline::{ScreeningPipeline, TradeSettings};
use rugscreen::engine::poller::{Collaborators, PollerState, PollerSettings, WatchlistPoller};
use rugscreen::engine::ScreenerContext;
use rugscreen::normalize::normalize;
use rugscreen::storage::metrics::{MetricsStore, SqliteMetricsStore};
use rugscreen::storage::SettingsStore;
use rugscreen::types::{FilterConfig, ListKind, TradeAction};

use crate::mock_collaborators::{
    pair_payload, FixedReputation, FixedScamDetector, RecordingNotifier, RecordingTrader,
    ScriptedMarket,
};

struct World {
    ctx: ScreenerContext,
    market: Arc<ScriptedMarket>,
    scam: Arc<FixedScamDetector>,
    reputation: Arc<FixedReputation>,
    notifier: Arc<RecordingNotifier>,
    trader: Arc<RecordingTrader>,
    poller: Arc<WatchlistPoller>,
    state_path: PathBuf,
}

impl Drop for World {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.state_path);
    }
}

struct Setup {
    watchlist: Vec<&'static str>,
    fake_volume: f64,
    is_good: bool,
    is_bundled: bool,
    notifier: RecordingNotifier,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            watchlist: vec!["0xtoken"],
            fake_volume: 2.0,
            is_good: true,
            is_bundled: false,
            notifier: RecordingNotifier::default(),
        }
    }
}

async fn world(setup: Setup) -> World {
    let state_path = std::env::temp_dir().join(format!(
        "rugscreen_it_{}.json",
        uuid::Uuid::new_v4()
    ));
    let settings = Arc::new(SettingsStore::open(&state_path, FilterConfig::default()).unwrap());
    let metrics = Arc::new(SqliteMetricsStore::in_memory().await.unwrap());
    let ctx = ScreenerContext::new(settings, metrics, Arc::new(ActivityLog::default()));

    let market = Arc::new(ScriptedMarket::default());
    let scam = Arc::new(FixedScamDetector::new(setup.fake_volume));
    let reputation = Arc::new(FixedReputation::new(setup.is_good, setup.is_bundled));
    let notifier = Arc::new(setup.notifier);
    let trader = Arc::new(RecordingTrader::default());

    let pipeline = Arc::new(ScreeningPipeline::new(
        &ctx,
        scam.clone(),
        reputation.clone(),
        TradeSettings {
            action: TradeAction::Buy,
            amount: dec!(0.1),
        },
    ));

    let poller = Arc::new(WatchlistPoller::new(
        ctx.clone(),
        Collaborators {
            market: market.clone(),
            notifier: notifier.clone(),
            trader: trader.clone(),
        },
        pipeline,
        PatternAnalyzer::with_defaults(Arc::clone(&ctx.metrics)),
        PollerSettings {
            watchlist: setup.watchlist.iter().map(|s| s.to_string()).collect(),
            interval: Duration::from_millis(20),
        },
    ));

    World {
        ctx,
        market,
        scam,
        reputation,
        notifier,
        trader,
        poller,
        state_path,
    }
}

/// Store an earlier observation so the volatility filter has history.
async fn seed_history(w: &World, address: &str, price: &str, hours_ago: i64) {
    let observed = Utc::now() - ChronoDuration::hours(hours_ago);
    let record = normalize(address, &pair_payload(address, "Moon", price, 50_000.0), observed).unwrap();
    w.ctx.metrics.append(&record).await.unwrap();
}

async fn messages(w: &World) -> Vec<String> {
    w.ctx
        .activity
        .entries()
        .await
        .into_iter()
        .map(|e| e.message)
        .collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_a_safe_token_is_accepted_and_traded() {
    let w = world(Setup::default()).await;
    // +5% between the two stored samples, max is 10%
    seed_history(&w, "0xtoken", "1.0", 2).await;
    seed_history(&w, "0xtoken", "1.05", 1).await;
    w.market.serve("0xtoken", pair_payload("0xtoken", "Moon", "1.05", 50_000.0));

    let report = w.poller.run_cycle().await;
    assert_eq!(report.accepted, 1);

    let history = w.ctx.metrics.recent("0xtoken", 5).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].price_usd, Some(1.05));

    assert_eq!(
        w.notifier.sent(),
        vec!["✅ Token Moon (0xtoken) is safe to trade.".to_string()]
    );
    assert_eq!(
        w.trader.orders(),
        vec![(TradeAction::Buy, "0xtoken".to_string(), dec!(0.1))]
    );
    assert!(messages(&w).await.contains(&"Sent trade command: /buy 0xtoken 0.1".to_string()));
}

#[tokio::test]
async fn scenario_b_bundled_token_is_blacklisted() {
    let w = world(Setup {
        is_bundled: true,
        ..Setup::default()
    })
    .await;
    seed_history(&w, "0xtoken", "1.0", 2).await;
    seed_history(&w, "0xtoken", "1.05", 1).await;
    w.market.serve("0xtoken", pair_payload("0xtoken", "Moon", "1.05", 50_000.0));

    let report = w.poller.run_cycle().await;
    assert_eq!(report.blacklisted, 1);

    assert!(w.ctx.blacklist.contains(ListKind::Coin, "0xtoken"));
    assert!(w.ctx.blacklist.contains(ListKind::Dev, "dev-0xtoken"));
    // Only the seeded samples, nothing new persisted
    assert_eq!(w.ctx.metrics.recent("0xtoken", 5).await.unwrap().len(), 2);
    assert!(w.trader.orders().is_empty());
    assert_eq!(
        w.notifier.sent(),
        vec!["🚨 Token Moon (0xtoken) has bundled supply and is blacklisted.".to_string()]
    );

    // Durable: a fresh store over the same file sees the ban
    let reopened = SettingsStore::open(&w.state_path, FilterConfig::default()).unwrap();
    assert!(reopened.blacklist().coins.contains("0xtoken"));
    assert!(reopened.blacklist().devs.contains("dev-0xtoken"));
}

#[tokio::test]
async fn scenario_c_blacklisted_token_makes_no_remote_calls() {
    let w = world(Setup::default()).await;
    w.ctx.blacklist.add("0xtoken", Some("dev-0xtoken")).unwrap();
    w.market.serve("0xtoken", pair_payload("0xtoken", "Moon", "1.05", 50_000.0));

    let report = w.poller.run_cycle().await;
    assert_eq!(report.rejected, 1);

    assert_eq!(w.scam.calls(), 0);
    assert_eq!(w.reputation.calls(), 0);
    assert!(w.notifier.sent().is_empty());
    assert!(w.trader.orders().is_empty());
    assert_eq!(messages(&w).await, vec!["Token 0xtoken is blacklisted.".to_string()]);
}

#[tokio::test]
async fn scenario_d_transport_failure_moves_to_next_address() {
    let w = world(Setup {
        watchlist: vec!["0xdown", "0xtoken"],
        ..Setup::default()
    })
    .await;
    w.market.take_offline("0xdown");
    w.market.serve("0xtoken", pair_payload("0xtoken", "Moon", "1.0", 50_000.0));

    let report = w.poller.run_cycle().await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.accepted, 1);
    assert_eq!(w.market.calls(), vec!["0xdown".to_string(), "0xtoken".to_string()]);

    // Only the accepted token reached the downstream services
    assert_eq!(w.scam.calls(), 1);
    assert_eq!(w.reputation.calls(), 1);

    let failures: Vec<_> = messages(&w)
        .await
        .into_iter()
        .filter(|m| m.contains("0xdown"))
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].starts_with("Failed to fetch data for token 0xdown"));
}

// ---------------------------------------------------------------------------
// Filters and side-effect policies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn low_liquidity_rejected_before_remote_calls() {
    let w = world(Setup::default()).await;
    w.market.serve("0xtoken", pair_payload("0xtoken", "Moon", "1.0", 9_999.0));

    let report = w.poller.run_cycle().await;
    assert_eq!(report.rejected, 1);
    assert_eq!(w.scam.calls(), 0);
    assert_eq!(messages(&w).await, vec!["Token 0xtoken has low liquidity.".to_string()]);
}

#[tokio::test]
async fn volatile_token_rejected() {
    let w = world(Setup::default()).await;
    seed_history(&w, "0xtoken", "1.0", 2).await;
    seed_history(&w, "0xtoken", "1.5", 1).await;
    w.market.serve("0xtoken", pair_payload("0xtoken", "Moon", "1.5", 50_000.0));

    let report = w.poller.run_cycle().await;
    assert_eq!(report.rejected, 1);
    assert_eq!(w.scam.calls(), 0);
    assert_eq!(
        messages(&w).await,
        vec!["Token 0xtoken has high price volatility.".to_string()]
    );
}

#[tokio::test]
async fn fake_volume_rejected_without_blacklisting() {
    let w = world(Setup {
        fake_volume: 5.0,
        ..Setup::default()
    })
    .await;
    w.market.serve("0xtoken", pair_payload("0xtoken", "Moon", "1.0", 50_000.0));

    let report = w.poller.run_cycle().await;
    assert_eq!(report.rejected, 1);
    assert_eq!(w.reputation.calls(), 0);
    assert!(!w.ctx.blacklist.contains(ListKind::Coin, "0xtoken"));
}

#[tokio::test]
async fn unrated_token_is_skipped_silently() {
    let w = world(Setup {
        is_good: false,
        ..Setup::default()
    })
    .await;
    w.market.serve("0xtoken", pair_payload("0xtoken", "Moon", "1.0", 50_000.0));

    let report = w.poller.run_cycle().await;
    assert_eq!(report.unrated, 1);
    assert!(messages(&w).await.is_empty());
    assert!(w.notifier.sent().is_empty());
    assert!(w.ctx.metrics.recent("0xtoken", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_alert_does_not_undo_accept() {
    let w = world(Setup {
        notifier: RecordingNotifier::failing(),
        ..Setup::default()
    })
    .await;
    w.market.serve("0xtoken", pair_payload("0xtoken", "Moon", "1.0", 50_000.0));

    let report = w.poller.run_cycle().await;
    assert_eq!(report.accepted, 1);
    assert_eq!(w.notifier.sent().len(), 1);
    assert_eq!(w.trader.orders().len(), 1);
    assert_eq!(w.ctx.metrics.recent("0xtoken", 5).await.unwrap().len(), 1);
}

#[tokio::test]
async fn filter_update_applies_on_next_cycle() {
    let w = world(Setup::default()).await;
    w.market.serve("0xtoken", pair_payload("0xtoken", "Moon", "1.0", 50_000.0));

    w.ctx
        .settings
        .replace_filters(FilterConfig {
            min_liquidity_usd: 100_000.0,
            ..FilterConfig::default()
        })
        .unwrap();

    let report = w.poller.run_cycle().await;
    assert_eq!(report.rejected, 1);
    assert_eq!(w.scam.calls(), 0);
}

// ---------------------------------------------------------------------------
// Pattern analysis and lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rug_pull_in_history_is_reported_not_banned() {
    let w = world(Setup {
        watchlist: vec![],
        ..Setup::default()
    })
    .await;
    seed_history(&w, "0xrug", "1.0", 3).await;
    seed_history(&w, "0xrug", "0.2", 2).await;
    seed_history(&w, "0xfine", "1.0", 3).await;
    seed_history(&w, "0xfine", "0.9", 2).await;

    let report = w.poller.run_cycle().await;
    assert_eq!(report.suspected_rug_pulls.len(), 1);
    assert_eq!(report.suspected_rug_pulls[0].address, "0xrug");
    assert!(!w.ctx.blacklist.contains(ListKind::Coin, "0xrug"));

    let logged = messages(&w).await;
    assert_eq!(logged.len(), 1);
    assert!(logged[0].starts_with("Potential rug pulls: 0xrug"));
}

#[tokio::test]
async fn poller_runs_until_stopped() {
    let w = world(Setup::default()).await;
    w.market.serve("0xtoken", pair_payload("0xtoken", "Moon", "1.0", 50_000.0));

    w.poller.start().unwrap();
    assert_eq!(w.poller.state(), PollerState::Polling);
    assert!(w.poller.start().is_err());

    // Give the loop time for a few passes
    tokio::time::sleep(Duration::from_millis(150)).await;
    w.poller.stop().await;
    assert_eq!(w.poller.state(), PollerState::Idle);

    let cycles = w.poller.cycles_completed();
    assert!(cycles >= 2);
    // Flat price, so every completed pass accepts again
    assert_eq!(w.trader.orders().len() as u64, cycles);

    let logged = messages(&w).await;
    assert_eq!(logged.first().map(String::as_str), Some("Bot started!"));
    assert_eq!(logged.last().map(String::as_str), Some("Bot stopped."));

    // No further work after stop
    let calls = w.market.calls().len();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(w.market.calls().len(), calls);
}
