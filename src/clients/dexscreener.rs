//! DexScreener market-data integration.
//!
//! API docs: https://docs.dexscreener.com/api/reference
//! Endpoint: GET {base}{tokenAddress}, e.g.
//! https://api.dexscreener.com/latest/dex/tokens/0x...
//! Rate limit: 300 requests/minute. No auth.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::MarketDataClient;
use crate::error::ScreenError;
use crate::types::RawPayload;

const SERVICE: &str = "dexscreener";

pub struct DexScreenerClient {
    http: Client,
    base_url: String,
}

impl DexScreenerClient {
    /// `base_url` is the token endpoint prefix; the address is appended as-is
    /// after URL-encoding.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            http: super::http_client(timeout_secs)?,
            base_url: base_url.into(),
        })
    }

    fn url_for(&self, address: &str) -> String {
        format!("{}{}", self.base_url, urlencoding::encode(address))
    }
}

#[async_trait]
impl MarketDataClient for DexScreenerClient {
    async fn fetch(&self, address: &str) -> Result<RawPayload, ScreenError> {
        let url = self.url_for(address);
        debug!(url = %url, "Fetching token data");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ScreenError::transport(SERVICE, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(ScreenError::transport(SERVICE, format!("HTTP {status}")));
        }

        resp.json::<RawPayload>()
            .await
            .map_err(|e| ScreenError::transport(SERVICE, format!("invalid body: {e}")))
    }
}
