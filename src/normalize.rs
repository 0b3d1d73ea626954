//! Data normalizer: raw market-data payload → canonical `TokenRecord`.
//!
//! Only the first pool listing is used; DexScreener orders pairs so the
//! primary (most liquid) pool comes first. Absent fields stay `None`.

use chrono::{DateTime, Utc};

use crate::error::ScreenError;
use crate::types::{RawPayload, TokenRecord};

/// Normalize the payload fetched for `address`, stamped with `observed_at`.
///
/// Fails when the payload has no pool listings at all. If the first pool
/// omits the base-token address, the queried address is used so the
/// blacklist stage always has something to check.
pub fn normalize(
    address: &str,
    payload: &RawPayload,
    observed_at: DateTime<Utc>,
) -> Result<TokenRecord, ScreenError> {
    let pair = payload
        .pairs
        .as_deref()
        .and_then(|pairs| pairs.first())
        .ok_or_else(|| ScreenError::Normalization {
            address: address.to_string(),
            reason: "no liquidity pool entries".to_string(),
        })?;

    let base = pair.base_token.as_ref();

    Ok(TokenRecord {
        timestamp: observed_at,
        token_address: base
            .and_then(|b| b.address.clone())
            .unwrap_or_else(|| address.to_string()),
        token_name: base.and_then(|b| b.name.clone()),
        price_usd: pair.price_usd.as_deref().and_then(parse_price),
        volume_24h: pair.volume.as_ref().and_then(|v| v.h24),
        liquidity_usd: pair.liquidity.as_ref().and_then(|l| l.usd),
        market_cap_usd: pair.fdv,
        chain: pair.chain_id.clone(),
        dev_address: base.and_then(|b| b.dev_address.clone()),
    })
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}
