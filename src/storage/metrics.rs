//! Metrics store: append-only time-series of token observations.
//!
//! Backed by SQLite (`token_metrics` table). Timestamps are stored as
//! microseconds since the Unix epoch so ordering is numeric. All queries
//! are parameterized.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::ScreenError;
use crate::types::TokenRecord;

/// Samples needed for a price change.
pub const PRICE_CHANGE_SAMPLES: u32 = 2;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Append an observation. Rejected if its timestamp is not strictly
    /// after the latest stored observation for the same address.
    async fn append(&self, record: &TokenRecord) -> Result<(), ScreenError>;

    /// Up to `n` most recent observations for `address`, newest first.
    async fn recent(&self, address: &str, n: u32) -> Result<Vec<TokenRecord>, ScreenError>;

    /// Every observation in the trailing `duration`, all addresses,
    /// grouped by address and oldest first within a group.
    async fn window(&self, duration: Duration) -> Result<Vec<TokenRecord>, ScreenError>;
}

// ---------------------------------------------------------------------------
// Price change
// ---------------------------------------------------------------------------

/// Fractional change between the two newest samples (`samples` newest first).
///
/// Returns 0.0 when there are fewer than two samples, when either price is
/// missing, or when the previous price is zero.
pub fn price_change(samples: &[TokenRecord]) -> f64 {
    match samples {
        [latest, previous, ..] => match (latest.price_usd, previous.price_usd) {
            (Some(p0), Some(p1)) if p1 != 0.0 => (p0 - p1) / p1,
            _ => 0.0,
        },
        _ => 0.0,
    }
}

/// Price change for `address` from the store's two most recent samples.
pub async fn price_change_for(store: &dyn MetricsStore, address: &str) -> Result<f64, ScreenError> {
    let samples = store.recent(address, PRICE_CHANGE_SAMPLES).await?;
    Ok(price_change(&samples))
}

// ---------------------------------------------------------------------------
// SQLite implementation
// ---------------------------------------------------------------------------

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS token_metrics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp INTEGER NOT NULL,
        token_address TEXT NOT NULL,
        token_name TEXT,
        price_usd REAL,
        volume_24h REAL,
        liquidity_usd REAL,
        market_cap_usd REAL,
        chain TEXT,
        dev_address TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_token_metrics_address_ts
        ON token_metrics (token_address, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_token_metrics_ts ON token_metrics (timestamp)",
];

const COLUMNS: &str = "timestamp, token_address, token_name, price_usd, volume_24h, \
                       liquidity_usd, market_cap_usd, chain, dev_address";

pub struct SqliteMetricsStore {
    pool: SqlitePool,
    /// Serializes the latest-timestamp check with the insert.
    write_lock: Mutex<()>,
}

impl SqliteMetricsStore {
    /// Open (creating if needed) the database at `database_url`,
    /// e.g. `sqlite://token_metrics.db`.
    pub async fn connect(database_url: &str) -> Result<Self, ScreenError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let store = Self::with_pool(pool).await?;
        info!(database_url, "Metrics store ready");
        Ok(store)
    }

    /// Private in-memory database on a single pinned connection.
    pub async fn in_memory() -> Result<Self, ScreenError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, ScreenError> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&pool).await?;
        }
        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    fn row_to_record(row: &SqliteRow) -> Result<TokenRecord, ScreenError> {
        let micros: i64 = row.try_get("timestamp")?;
        let timestamp = DateTime::<Utc>::from_timestamp_micros(micros)
            .ok_or_else(|| ScreenError::store(format!("timestamp out of range: {micros}")))?;

        Ok(TokenRecord {
            timestamp,
            token_address: row.try_get("token_address")?,
            token_name: row.try_get("token_name")?,
            price_usd: row.try_get("price_usd")?,
            volume_24h: row.try_get("volume_24h")?,
            liquidity_usd: row.try_get("liquidity_usd")?,
            market_cap_usd: row.try_get("market_cap_usd")?,
            chain: row.try_get("chain")?,
            dev_address: row.try_get("dev_address")?,
        })
    }
}

#[async_trait]
impl MetricsStore for SqliteMetricsStore {
    async fn append(&self, record: &TokenRecord) -> Result<(), ScreenError> {
        let micros = record.timestamp.timestamp_micros();

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let latest: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(timestamp) FROM token_metrics WHERE token_address = ?",
        )
        .bind(record.token_address.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if let Some(latest) = latest {
            if micros <= latest {
                return Err(ScreenError::store(format!(
                    "sample for {} at {} is not after the latest stored sample",
                    record.token_address, record.timestamp
                )));
            }
        }

        sqlx::query(&format!(
            "INSERT INTO token_metrics ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(micros)
        .bind(record.token_address.as_str())
        .bind(record.token_name.as_deref())
        .bind(record.price_usd)
        .bind(record.volume_24h)
        .bind(record.liquidity_usd)
        .bind(record.market_cap_usd)
        .bind(record.chain.as_deref())
        .bind(record.dev_address.as_deref())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(address = %record.token_address, "Sample appended");
        Ok(())
    }

    async fn recent(&self, address: &str, n: u32) -> Result<Vec<TokenRecord>, ScreenError> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM token_metrics
             WHERE token_address = ?
             ORDER BY timestamp DESC, id DESC
             LIMIT ?"
        ))
        .bind(address)
        .bind(i64::from(n))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn window(&self, duration: Duration) -> Result<Vec<TokenRecord>, ScreenError> {
        let cutoff = (Utc::now() - duration).timestamp_micros();
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM token_metrics
             WHERE timestamp >= ?
             ORDER BY token_address ASC, timestamp ASC, id ASC"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_record).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
