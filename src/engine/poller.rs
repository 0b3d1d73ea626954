//! Watchlist poller: drives the screening loop.
//!
//! Two states: `Idle` and `Polling`. While polling, each cycle walks the
//! watchlist strictly in order (fetch → normalize → screen → apply), runs
//! the pattern analyzer, then sleeps a fixed interval. `stop()` is checked
//! between addresses and while sleeping; an address already being
//! processed always finishes, so a blacklist write is never cut short.

use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::analyzer::{PatternAnalyzer, SuspectedRugPull};
use super::pipeline::Screener;
use super::ScreenerContext;
use crate::clients::{MarketDataClient, Notifier, TradeExecutor};
use crate::normalize::normalize;
use crate::types::{Decision, TokenRecord, TradeOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollerState {
    Idle,
    Polling,
}

impl std::fmt::Display for PollerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollerState::Idle => write!(f, "idle"),
            PollerState::Polling => write!(f, "polling"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PollerError {
    #[error("poller is already running")]
    AlreadyRunning,
}

/// Outbound side-effect capabilities.
#[derive(Clone)]
pub struct Collaborators {
    pub market: Arc<dyn MarketDataClient>,
    pub notifier: Arc<dyn Notifier>,
    pub trader: Arc<dyn TradeExecutor>,
}

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub watchlist: Vec<String>,
    pub interval: Duration,
}

/// What happened to one address in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressOutcome {
    Accepted,
    Blacklisted,
    Rejected,
    Unrated,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub screened: usize,
    pub accepted: usize,
    pub blacklisted: usize,
    pub rejected: usize,
    pub unrated: usize,
    pub failed: usize,
    pub suspected_rug_pulls: Vec<SuspectedRugPull>,
    /// Stop was requested before the pass completed.
    pub cancelled: bool,
}

impl CycleReport {
    fn record(&mut self, outcome: AddressOutcome) {
        self.screened += 1;
        match outcome {
            AddressOutcome::Accepted => self.accepted += 1,
            AddressOutcome::Blacklisted => self.blacklisted += 1,
            AddressOutcome::Rejected => self.rejected += 1,
            AddressOutcome::Unrated => self.unrated += 1,
            AddressOutcome::Failed => self.failed += 1,
        }
    }
}

/// One spawned loop and the signal that stops it. Each run owns its
/// channel, so a later run can never clear an earlier run's stop.
struct Run {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct WatchlistPoller {
    ctx: ScreenerContext,
    collab: Collaborators,
    screener: Arc<dyn Screener>,
    analyzer: PatternAnalyzer,
    settings: PollerSettings,
    /// Held across the join in `stop()`, so a draining run still counts
    /// as polling.
    run: AsyncMutex<Option<Run>>,
    last_report: Mutex<Option<CycleReport>>,
    cycles: AtomicU64,
}

impl WatchlistPoller {
    pub fn new(
        ctx: ScreenerContext,
        collab: Collaborators,
        screener: Arc<dyn Screener>,
        analyzer: PatternAnalyzer,
        settings: PollerSettings,
    ) -> Self {
        Self {
            ctx,
            collab,
            screener,
            analyzer,
            settings,
            run: AsyncMutex::new(None),
            last_report: Mutex::new(None),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> PollerState {
        match self.run.try_lock() {
            Ok(slot) => match slot.as_ref() {
                Some(run) if !run.handle.is_finished() => PollerState::Polling,
                _ => PollerState::Idle,
            },
            // A stop is still draining the loop
            Err(_) => PollerState::Polling,
        }
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn watchlist(&self) -> &[String] {
        &self.settings.watchlist
    }

    /// Report of the most recent pass, complete or cancelled.
    pub fn last_report(&self) -> Option<CycleReport> {
        self.lock_last_report().clone()
    }

    /// Idle → Polling. Spawns the loop on the current runtime.
    pub fn start(self: &Arc<Self>) -> Result<(), PollerError> {
        let Ok(mut slot) = self.run.try_lock() else {
            return Err(PollerError::AlreadyRunning);
        };
        if matches!(slot.as_ref(), Some(run) if !run.handle.is_finished()) {
            return Err(PollerError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let poller = Arc::clone(self);
        let handle = tokio::spawn(async move { poller.run_loop(stop_rx).await });
        *slot = Some(Run { stop_tx, handle });

        info!(
            watchlist = self.settings.watchlist.len(),
            interval_secs = self.settings.interval.as_secs(),
            "Poller started"
        );
        Ok(())
    }

    /// Polling → Idle. Signals the loop and waits for it to wind down.
    /// A no-op when already idle.
    pub async fn stop(&self) {
        let mut slot = self.run.lock().await;
        if let Some(run) = slot.take() {
            run.stop_tx.send_replace(true);
            if let Err(e) = run.handle.await {
                warn!(error = %e, "Poller task ended abnormally");
            }
            info!("Poller stopped");
        }
    }

    fn lock_last_report(&self) -> MutexGuard<'_, Option<CycleReport>> {
        self.last_report
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        self.ctx.activity.info("Bot started!").await;

        loop {
            let report = self.cycle(&stop_rx).await;
            log_cycle_report(&report);

            if report.cancelled || *stop_rx.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = stop_rx.wait_for(|stop| *stop) => break,
            }
        }

        self.ctx.activity.info("Bot stopped.").await;
    }

    /// One full pass over the watchlist followed by the pattern analyzer,
    /// outside of the polling loop.
    pub async fn run_cycle(&self) -> CycleReport {
        let (_stop_tx, stop_rx) = watch::channel(false);
        self.cycle(&stop_rx).await
    }

    async fn cycle(&self, stop: &watch::Receiver<bool>) -> CycleReport {
        let report = self.pass(stop).await;
        *self.lock_last_report() = Some(report.clone());
        report
    }

    async fn pass(&self, stop: &watch::Receiver<bool>) -> CycleReport {
        let mut report = CycleReport {
            cycle: self.cycles.load(Ordering::Relaxed) + 1,
            ..CycleReport::default()
        };

        for address in &self.settings.watchlist {
            if *stop.borrow() {
                report.cancelled = true;
                return report;
            }
            let outcome = self.process_address(address).await;
            report.record(outcome);
        }

        match self.analyzer.run().await {
            Ok(analysis) => {
                if !analysis.suspects.is_empty() {
                    self.ctx
                        .activity
                        .warn(format!("Potential rug pulls: {}", analysis.summary()))
                        .await;
                }
                report.suspected_rug_pulls = analysis.suspects;
            }
            Err(e) => {
                self.ctx
                    .activity
                    .error(format!("Pattern analysis failed: {e}"))
                    .await;
            }
        }

        self.cycles.fetch_add(1, Ordering::Relaxed);
        report
    }

    /// Fetch, normalize, screen and apply for one address. Every failure
    /// is logged once and scoped to this address.
    pub async fn process_address(&self, address: &str) -> AddressOutcome {
        let activity = &self.ctx.activity;

        let payload = match self.collab.market.fetch(address).await {
            Ok(p) => p,
            Err(e) => {
                activity
                    .warn(format!("Failed to fetch data for token {address}: {e}"))
                    .await;
                return AddressOutcome::Failed;
            }
        };

        let record = match normalize(address, &payload, Utc::now()) {
            Ok(r) => r,
            Err(e) => {
                activity.warn(format!("Skipping token {address}: {e}")).await;
                return AddressOutcome::Failed;
            }
        };

        // One consistent snapshot for the whole run
        let filters = self.ctx.settings.filters();

        let decision = match self.screener.screen(address, &record, &filters).await {
            Ok(d) => d,
            Err(e) => {
                activity
                    .warn(format!("Screening aborted for token {address}: {e}"))
                    .await;
                return AddressOutcome::Failed;
            }
        };

        debug!(address, decision = decision.label(), "Screened");
        self.apply(decision).await
    }

    async fn apply(&self, decision: Decision) -> AddressOutcome {
        let activity = &self.ctx.activity;

        match decision {
            Decision::Accept { record, trade } => self.accept(record, trade).await,

            Decision::Blacklist { address, record } => self.ban(&address, record).await,

            d @ (Decision::RejectFilter { .. } | Decision::RejectBlacklisted(_)) => {
                activity.info(d.to_string()).await;
                AddressOutcome::Rejected
            }

            Decision::Unrated { address } => {
                debug!(address = %address, "Reputation inconclusive, skipping");
                AddressOutcome::Unrated
            }
        }
    }

    async fn accept(&self, record: TokenRecord, trade: TradeOrder) -> AddressOutcome {
        let activity = &self.ctx.activity;

        if let Err(e) = self.ctx.metrics.append(&record).await {
            activity
                .error(format!(
                    "Failed to record metrics for token {}: {e}",
                    record.token_address
                ))
                .await;
            return AddressOutcome::Failed;
        }

        let alert = format!(
            "✅ Token {} ({}) is safe to trade.",
            record.display_name(),
            trade.address
        );
        self.notify(&alert).await;

        match self
            .collab
            .trader
            .execute(trade.action, &trade.address, trade.amount)
            .await
        {
            Ok(()) => activity.info(format!("Sent trade command: {}", trade.command())).await,
            Err(e) => activity.warn(format!("Failed to execute trade: {e:#}")).await,
        }

        AddressOutcome::Accepted
    }

    async fn ban(&self, address: &str, record: TokenRecord) -> AddressOutcome {
        let activity = &self.ctx.activity;
        let dev = record.dev_address.as_deref();

        if let Err(e) = self.ctx.blacklist.add(address, dev) {
            activity
                .error(format!("Failed to blacklist token {address}: {e}"))
                .await;
            return AddressOutcome::Failed;
        }

        activity
            .info(format!(
                "Added {address} and dev {} to blacklist.",
                dev.unwrap_or("unknown")
            ))
            .await;

        let alert = format!(
            "🚨 Token {} ({address}) has bundled supply and is blacklisted.",
            record.display_name()
        );
        self.notify(&alert).await;

        AddressOutcome::Blacklisted
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self.collab.notifier.send(text).await {
            self.ctx
                .activity
                .warn(format!("Failed to send Telegram message: {e:#}"))
                .await;
        }
    }
}

/// Log a human-readable cycle summary.
fn log_cycle_report(report: &CycleReport) {
    info!(
        cycle = report.cycle,
        screened = report.screened,
        accepted = report.accepted,
        blacklisted = report.blacklisted,
        rejected = report.rejected,
        unrated = report.unrated,
        failed = report.failed,
        rug_pulls = report.suspected_rug_pulls.len(),
        cancelled = report.cancelled,
        "Cycle complete"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
