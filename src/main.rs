//! RUGSCREEN: DEX token screening agent
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the state document and metrics database, wires the HTTP
//! collaborators into the screening engine, and runs the watchlist
//! poller until Ctrl+C.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use rugscreen::activity::ActivityLog;
use rugscreen::api::{self, ApiState};
use rugscreen::clients::dexscreener::DexScreenerClient;
use rugscreen::clients::pocket_universe::PocketUniverseClient;
use rugscreen::clients::rugcheck::RugCheckClient;
use rugscreen::clients::telegram::{
    DryRunTradeExecutor, LogOnlyNotifier, TelegramClient, TelegramNotifier, TelegramTradeExecutor,
};
use rugscreen::clients::{Notifier, TradeExecutor};
use rugscreen::config::{self, AppConfig};
use rugscreen::engine::analyzer::PatternAnalyzer;
use rugscreen::engine::pipeline::{ScreeningPipeline, TradeSettings};
use rugscreen::engine::poller::{Collaborators, PollerSettings, WatchlistPoller};
use rugscreen::engine::ScreenerContext;
use rugscreen::storage::metrics::SqliteMetricsStore;
use rugscreen::storage::SettingsStore;

const BANNER: &str = r#"
 ___ _   _  ___ ___  ___ ___ ___ ___ _  _
| _ \ | | |/ __/ __|/ __| _ \ __| __| \| |
|   / |_| | (_ \__ \ (__|   / _|| _|| .` |
|_|_\\___/ \___|___/\___|_|_\___|___|_|\_|

  DEX token screening agent
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load("config.toml")?;
    init_logging();

    println!("{BANNER}");
    info!(
        name = %cfg.poller.name,
        interval_secs = cfg.poller.update_interval_secs,
        watchlist = cfg.poller.watchlist.len(),
        "RUGSCREEN starting up"
    );

    // -- Persistent state ------------------------------------------------

    let settings = Arc::new(SettingsStore::open(
        &cfg.storage.state_file,
        cfg.filters.clone(),
    )?);
    let metrics = Arc::new(
        SqliteMetricsStore::connect(&cfg.storage.database_url)
            .await
            .with_context(|| format!("Failed to open metrics database {}", cfg.storage.database_url))?,
    );
    let activity = Arc::new(ActivityLog::new(cfg.logging.activity_capacity));
    let ctx = ScreenerContext::new(Arc::clone(&settings), metrics, Arc::clone(&activity));

    let (coins, devs) = ctx.blacklist.sizes();
    info!(
        state_file = %settings.path().display(),
        blacklisted_tokens = coins,
        blacklisted_devs = devs,
        "State document loaded"
    );

    // -- Collaborators ---------------------------------------------------

    let timeout = cfg.endpoints.request_timeout_secs;
    let market = Arc::new(DexScreenerClient::new(&cfg.endpoints.dex_screener_api_url, timeout)?);

    let pu_key = AppConfig::resolve_env(&cfg.endpoints.pocket_universe_api_key_env)
        .unwrap_or_else(|e| {
            warn!(error = %e, "No Pocket Universe API key; scam checks will be rejected");
            String::new()
        });
    let scam = Arc::new(PocketUniverseClient::new(
        &cfg.endpoints.pocket_universe_api_url,
        SecretString::new(pu_key),
        timeout,
    )?);
    let reputation = Arc::new(RugCheckClient::new(&cfg.endpoints.rugcheck_api_url, timeout)?);

    let (notifier, trader) = telegram_collaborators(&cfg)?;

    // -- Engine ----------------------------------------------------------

    let pipeline = Arc::new(ScreeningPipeline::new(
        &ctx,
        scam,
        reputation,
        TradeSettings {
            action: cfg.poller.trade_action,
            amount: cfg.poller.trade_amount,
        },
    ));
    let analyzer = PatternAnalyzer::new(
        Arc::clone(&ctx.metrics),
        chrono::Duration::hours(cfg.analyzer.window_hours),
        cfg.analyzer.rug_pull_threshold,
    );
    let poller = Arc::new(WatchlistPoller::new(
        ctx,
        Collaborators {
            market,
            notifier,
            trader,
        },
        pipeline,
        analyzer,
        PollerSettings {
            watchlist: cfg.poller.watchlist.clone(),
            interval: Duration::from_secs(cfg.poller.update_interval_secs),
        },
    ));

    if cfg.api.enabled {
        let state = Arc::new(ApiState::new(
            cfg.poller.name.clone(),
            Arc::clone(&poller),
            Arc::clone(&settings),
            Arc::clone(&activity),
        ));
        api::spawn_api(state, cfg.api.port).await?;
    }

    // -- Run until Ctrl+C ------------------------------------------------

    poller.start()?;
    info!("Polling. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received.");

    poller.stop().await;
    let blacklist = settings.blacklist();
    info!(
        cycles = poller.cycles_completed(),
        blacklisted_tokens = blacklist.coins.len(),
        blacklisted_devs = blacklist.devs.len(),
        "RUGSCREEN shut down cleanly."
    );

    Ok(())
}

/// Telegram-backed notifier and trade gateway, or log-only fallbacks when
/// the bot token or chat ids are not configured. Trade commands go to the
/// alert chat unless a dedicated trade chat is set.
fn telegram_collaborators(
    cfg: &AppConfig,
) -> Result<(Arc<dyn Notifier>, Arc<dyn TradeExecutor>)> {
    let channels = cfg.telegram.resolve();
    let Some(token) = channels.bot_token else {
        warn!("No Telegram bot token configured; alerts are log-only and trades are dry-run");
        return Ok((Arc::new(LogOnlyNotifier), Arc::new(DryRunTradeExecutor)));
    };

    let client = Arc::new(TelegramClient::new(token, cfg.endpoints.request_timeout_secs)?);

    let notifier: Arc<dyn Notifier> = match channels.alert_chat {
        Some(chat) => Arc::new(TelegramNotifier::new(Arc::clone(&client), chat)),
        None => {
            warn!("No Telegram chat id configured; alerts are log-only");
            Arc::new(LogOnlyNotifier)
        }
    };
    let trader: Arc<dyn TradeExecutor> = match channels.trade_chat {
        Some(chat) => Arc::new(TelegramTradeExecutor::new(client, chat)),
        None => {
            warn!("No Telegram chat id configured; trades are dry-run");
            Arc::new(DryRunTradeExecutor)
        }
    };

    Ok((notifier, trader))
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rugscreen=info"));

    if std::env::var("RUGSCREEN_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
