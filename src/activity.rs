//! Activity log: the operator-facing record of what the agent did.
//!
//! Every entry is also emitted through `tracing`, so structured logs and
//! the control API's `/api/logs` view never diverge. The log is bounded;
//! the oldest entries are evicted first.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Default number of entries retained.
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

pub struct ActivityLog {
    entries: RwLock<VecDeque<LogEntry>>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.append(LogLevel::Info, message.into()).await;
    }

    pub async fn warn(&self, message: impl Into<String>) {
        self.append(LogLevel::Warn, message.into()).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.append(LogLevel::Error, message.into()).await;
    }

    pub async fn append(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => info!(target: "rugscreen::activity", "{message}"),
            LogLevel::Warn => warn!(target: "rugscreen::activity", "{message}"),
            LogLevel::Error => error!(target: "rugscreen::activity", "{message}"),
        }

        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            timestamp: Utc::now(),
            level,
            message,
        });
    }

    /// Full log, oldest first.
    pub async fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
