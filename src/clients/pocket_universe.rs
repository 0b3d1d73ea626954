//! Pocket Universe fake-volume detection.
//!
//! POST {url} with `Authorization: Bearer {key}` and body
//! `{"token_address": "..."}`. Response carries `fake_volume_percentage`.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ScamDetectionClient;
use crate::error::ScreenError;

const SERVICE: &str = "pocket_universe";

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    token_address: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    /// Absent means the service found nothing to flag.
    #[serde(default)]
    fake_volume_percentage: f64,
}

pub struct PocketUniverseClient {
    http: Client,
    url: String,
    api_key: SecretString,
}

impl PocketUniverseClient {
    pub fn new(url: impl Into<String>, api_key: SecretString, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            http: super::http_client(timeout_secs)?,
            url: url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl ScamDetectionClient for PocketUniverseClient {
    async fn analyze(&self, address: &str) -> Result<f64, ScreenError> {
        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&AnalyzeRequest {
                token_address: address,
            })
            .send()
            .await
            .map_err(|e| ScreenError::transport(SERVICE, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(ScreenError::transport(SERVICE, format!("HTTP {status}")));
        }

        let analysis: AnalyzeResponse = resp
            .json()
            .await
            .map_err(|e| ScreenError::transport(SERVICE, format!("invalid body: {e}")))?;

        debug!(
            address,
            fake_volume_pct = analysis.fake_volume_percentage,
            "Fake volume analysis"
        );
        Ok(analysis.fake_volume_percentage)
    }
}
