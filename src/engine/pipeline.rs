//! Screening pipeline.
//!
//! An ordered, short-circuiting filter chain over one `TokenRecord`:
//!
//! 1. Blacklist (token or dev). No remote call is made if this fires
//! 2. Liquidity floor
//! 3. Volatility (price change between the two newest stored samples)
//! 4. Fake volume (remote scam detection)
//! 5. Reputation (remote; good → accept, bundled → blacklist)
//!
//! The remote checks and the trade order key on the watched address that
//! was queried, which can differ from the record's base-token address when
//! the first pool lists the watched token on the quote side.
//!
//! The pipeline never performs side effects. It returns a `Decision`
//! describing them; the poller applies it.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use super::ScreenerContext;
use crate::clients::{ReputationClient, ScamDetectionClient};
use crate::error::ScreenError;
use crate::storage::blacklist::BlacklistRegistry;
use crate::storage::metrics::{price_change_for, MetricsStore};
use crate::types::{
    BlacklistHit, Decision, FilterConfig, ListKind, RejectReason, TokenRecord, TradeAction,
    TradeOrder,
};

/// Seam between the poller and the decision logic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Screener: Send + Sync {
    /// Screen the record fetched for watched `address` against a filter
    /// snapshot.
    async fn screen(
        &self,
        address: &str,
        record: &TokenRecord,
        filters: &FilterConfig,
    ) -> Result<Decision, ScreenError>;
}

/// What to dispatch when a token is accepted. The amount is configuration,
/// not computed.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSettings {
    pub action: TradeAction,
    pub amount: Decimal,
}

pub struct ScreeningPipeline {
    blacklist: BlacklistRegistry,
    metrics: Arc<dyn MetricsStore>,
    scam: Arc<dyn ScamDetectionClient>,
    reputation: Arc<dyn ReputationClient>,
    trade: TradeSettings,
}

impl ScreeningPipeline {
    pub fn new(
        ctx: &ScreenerContext,
        scam: Arc<dyn ScamDetectionClient>,
        reputation: Arc<dyn ReputationClient>,
        trade: TradeSettings,
    ) -> Self {
        Self {
            blacklist: ctx.blacklist.clone(),
            metrics: Arc::clone(&ctx.metrics),
            scam,
            reputation,
            trade,
        }
    }
}

#[async_trait]
impl Screener for ScreeningPipeline {
    async fn screen(
        &self,
        address: &str,
        record: &TokenRecord,
        filters: &FilterConfig,
    ) -> Result<Decision, ScreenError> {
        // 1. Blacklist; bans are recorded under the watched address
        if self.blacklist.contains(ListKind::Coin, address) {
            return Ok(Decision::RejectBlacklisted(BlacklistHit {
                kind: ListKind::Coin,
                address: address.to_string(),
            }));
        }
        if let Some(hit) = self.blacklist.check(record) {
            return Ok(Decision::RejectBlacklisted(hit));
        }

        // 2-3 read the record's own address: metrics history is keyed on it
        let token = record.token_address.as_str();

        // 2. Liquidity; a missing figure fails the floor
        let liquid = matches!(record.liquidity_usd, Some(l) if l >= filters.min_liquidity_usd);
        if !liquid {
            return Ok(Decision::RejectFilter {
                address: token.to_string(),
                reason: RejectReason::LowLiquidity {
                    liquidity_usd: record.liquidity_usd,
                    min: filters.min_liquidity_usd,
                },
            });
        }

        // 3. Volatility
        let price_change = price_change_for(self.metrics.as_ref(), token).await?;
        if price_change > filters.max_price_change_24h {
            return Ok(Decision::RejectFilter {
                address: token.to_string(),
                reason: RejectReason::HighVolatility {
                    price_change,
                    max: filters.max_price_change_24h,
                },
            });
        }

        // 4. Fake volume
        let fake_pct = self.scam.analyze(address).await?;
        debug!(address, fake_volume_pct = fake_pct, "Fake volume percentage");
        if fake_pct >= filters.max_fake_volume_percentage {
            return Ok(Decision::RejectFilter {
                address: address.to_string(),
                reason: RejectReason::FakeVolume {
                    percentage: fake_pct,
                    max: filters.max_fake_volume_percentage,
                },
            });
        }

        // 5. Reputation
        let rep = self.reputation.check(address).await?;
        debug!(address, good = rep.is_good, bundled = rep.is_bundled, "Reputation");

        let decision = if rep.is_bundled {
            Decision::Blacklist {
                address: address.to_string(),
                record: record.clone(),
            }
        } else if rep.is_good {
            Decision::Accept {
                record: record.clone(),
                trade: TradeOrder {
                    action: self.trade.action,
                    address: address.to_string(),
                    amount: self.trade.amount,
                },
            }
        } else {
            Decision::Unrated {
                address: address.to_string(),
            }
        };
        Ok(decision)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
