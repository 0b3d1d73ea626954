//! RugCheck reputation check.
//!
//! GET {base}/{address}. A token is "good" when `status == "Good"`;
//! `is_bundled` flags suspicious supply concentration.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::ReputationClient;
use crate::error::ScreenError;
use crate::types::Reputation;

const SERVICE: &str = "rugcheck";

#[derive(Debug, Deserialize)]
struct RugCheckReport {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    is_bundled: bool,
}

impl From<RugCheckReport> for Reputation {
    fn from(r: RugCheckReport) -> Self {
        Reputation {
            is_good: r.status.as_deref() == Some("Good"),
            is_bundled: r.is_bundled,
        }
    }
}

pub struct RugCheckClient {
    http: Client,
    base_url: String,
}

impl RugCheckClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            http: super::http_client(timeout_secs)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReputationClient for RugCheckClient {
    async fn check(&self, address: &str) -> Result<Reputation, ScreenError> {
        let url = format!("{}/{}", self.base_url, urlencoding::encode(address));

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

        let report: RugCheckReport = resp
            .json()
            .await
            .map_err(|e| ScreenError::transport(SERVICE, format!("invalid body: {e}")))?;

        debug!(address, status = ?report.status, bundled = report.is_bundled, "Reputation report");
        Ok(report.into())
    }
}
