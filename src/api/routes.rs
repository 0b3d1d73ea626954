//! Control API route handlers.
//!
//! All endpoints speak JSON. State is shared via `Arc<ApiState>`.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::activity::{ActivityLog, LogEntry};
use crate::engine::poller::{PollerError, PollerState, WatchlistPoller};
use crate::storage::blacklist::BlacklistRegistry;
use crate::storage::SettingsStore;
use crate::types::FilterConfig;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub name: String,
    pub poller: Arc<WatchlistPoller>,
    pub settings: Arc<SettingsStore>,
    pub blacklist: BlacklistRegistry,
    pub activity: Arc<ActivityLog>,
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(
        name: impl Into<String>,
        poller: Arc<WatchlistPoller>,
        settings: Arc<SettingsStore>,
        activity: Arc<ActivityLog>,
    ) -> Self {
        Self {
            name: name.into(),
            poller,
            blacklist: BlacklistRegistry::new(Arc::clone(&settings)),
            settings,
            activity,
            started_at: Utc::now(),
        }
    }
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub name: String,
    pub state: PollerState,
    pub cycles_completed: u64,
    pub watchlist: Vec<String>,
    pub blacklisted_tokens: usize,
    pub blacklisted_devs: usize,
    pub log_entries: usize,
    pub uptime_secs: i64,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({ "error": message.to_string() })))
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /api/start
pub async fn start(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    match state.poller.start() {
        Ok(()) => Ok(Json(json!({ "status": PollerState::Polling }))),
        Err(e @ PollerError::AlreadyRunning) => Err(api_error(StatusCode::CONFLICT, e)),
    }
}

/// POST /api/stop
pub async fn stop(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.poller.stop().await;
    Json(json!({ "status": PollerState::Idle }))
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let (coins, devs) = state.blacklist.sizes();
    Json(StatusResponse {
        name: state.name.clone(),
        state: state.poller.state(),
        cycles_completed: state.poller.cycles_completed(),
        watchlist: state.poller.watchlist().to_vec(),
        blacklisted_tokens: coins,
        blacklisted_devs: devs,
        log_entries: state.activity.len().await,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// GET /api/filters
pub async fn get_filters(State(state): State<AppState>) -> Json<FilterConfig> {
    Json(state.settings.filters())
}

/// POST /api/filters. Full replace; unknown keys are kept.
pub async fn replace_filters(
    State(state): State<AppState>,
    Json(filters): Json<FilterConfig>,
) -> Result<Json<FilterConfig>, ApiError> {
    if let Err(e) = state.settings.replace_filters(filters.clone()) {
        error!(error = %e, "Failed to persist filters");
        return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")));
    }
    info!(
        min_liquidity_usd = filters.min_liquidity_usd,
        max_price_change_24h = filters.max_price_change_24h,
        max_fake_volume_percentage = filters.max_fake_volume_percentage,
        "Filters replaced"
    );
    state.activity.info("Filters updated.").await;
    Ok(Json(filters))
}

/// GET /api/logs
pub async fn get_logs(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.activity.entries().await)
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
