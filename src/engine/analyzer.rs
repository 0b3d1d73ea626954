//! Pattern analyzer: retrospective rug-pull detection.
//!
//! Runs once per watchlist pass over the trailing window of the metrics
//! store. Flags every consecutive pair of samples for an address whose
//! price fell by at least the threshold. Purely observational: it never
//! touches the blacklist.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ScreenError;
use crate::storage::metrics::MetricsStore;
use crate::types::TokenRecord;

/// A fall of 50% or more between consecutive samples.
pub const DEFAULT_RUG_PULL_THRESHOLD: f64 = -0.5;

/// Lookback for the analysis.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// One suspicious transition between consecutive samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuspectedRugPull {
    pub address: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub price_before: f64,
    pub price_after: f64,
    /// Fractional change, e.g. -0.8
    pub change: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PatternReport {
    pub samples: usize,
    pub addresses: usize,
    pub suspects: Vec<SuspectedRugPull>,
}

impl PatternReport {
    /// Distinct flagged addresses, sorted.
    pub fn flagged_addresses(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.suspects.iter().map(|s| s.address.as_str()).collect();
        out.dedup();
        out
    }

    /// One-line description for the activity log.
    pub fn summary(&self) -> String {
        self.suspects
            .iter()
            .map(|s| {
                format!(
                    "{} {:.1}% ({} → {} at {})",
                    s.address,
                    s.change * 100.0,
                    s.price_before,
                    s.price_after,
                    s.to.format("%Y-%m-%d %H:%M:%S UTC"),
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Group by address, order each group by time, and flag consecutive pairs
/// whose change is at or below `threshold`. Pairs where either price is
/// missing, or the earlier price is zero, are skipped.
pub fn detect_rug_pulls(records: &[TokenRecord], threshold: f64) -> Vec<SuspectedRugPull> {
    let mut groups: BTreeMap<&str, Vec<&TokenRecord>> = BTreeMap::new();
    for r in records {
        groups.entry(r.token_address.as_str()).or_default().push(r);
    }

    let mut suspects = Vec::new();
    for (address, mut group) in groups {
        group.sort_by_key(|r| r.timestamp);

        for pair in group.windows(2) {
            let (before, after) = (pair[0], pair[1]);
            let (Some(p1), Some(p0)) = (before.price_usd, after.price_usd) else {
                continue;
            };
            if p1 == 0.0 {
                continue;
            }

            let change = (p0 - p1) / p1;
            if change <= threshold {
                suspects.push(SuspectedRugPull {
                    address: address.to_string(),
                    from: before.timestamp,
                    to: after.timestamp,
                    price_before: p1,
                    price_after: p0,
                    change,
                });
            }
        }
    }
    suspects
}

pub struct PatternAnalyzer {
    metrics: Arc<dyn MetricsStore>,
    window: Duration,
    threshold: f64,
}

impl PatternAnalyzer {
    pub fn new(metrics: Arc<dyn MetricsStore>, window: Duration, threshold: f64) -> Self {
        Self {
            metrics,
            window,
            threshold,
        }
    }

    /// Analyzer over the default 24h window and −50% threshold.
    pub fn with_defaults(metrics: Arc<dyn MetricsStore>) -> Self {
        Self::new(
            metrics,
            Duration::hours(DEFAULT_WINDOW_HOURS),
            DEFAULT_RUG_PULL_THRESHOLD,
        )
    }

    pub async fn run(&self) -> Result<PatternReport, ScreenError> {
        let records = self.metrics.window(self.window).await?;
        let suspects = detect_rug_pulls(&records, self.threshold);

        let mut addresses: Vec<&str> = records.iter().map(|r| r.token_address.as_str()).collect();
        addresses.sort_unstable();
        addresses.dedup();

        let report = PatternReport {
            samples: records.len(),
            addresses: addresses.len(),
            suspects,
        };

        if report.suspects.is_empty() {
            debug!(samples = report.samples, "No rug-pull patterns in window");
        } else {
            info!(
                samples = report.samples,
                flagged = report.flagged_addresses().len(),
                "Rug-pull patterns detected"
            );
        }
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
