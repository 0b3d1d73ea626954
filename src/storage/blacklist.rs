//! Blacklist registry: banned token and developer addresses.
//!
//! Membership only grows: there is no removal path. Every `add` that
//! changes the set is flushed to the state document before returning.

use std::sync::Arc;
use tracing::info;

use super::SettingsStore;
use crate::error::ScreenError;
use crate::types::{BlacklistHit, ListKind, TokenRecord};

#[derive(Clone)]
pub struct BlacklistRegistry {
    settings: Arc<SettingsStore>,
}

impl BlacklistRegistry {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self { settings }
    }

    pub fn contains(&self, kind: ListKind, address: &str) -> bool {
        self.settings.read(|doc| doc.blacklist.contains(kind, address))
    }

    /// First blacklist entry matching the record: token before dev.
    pub fn check(&self, record: &TokenRecord) -> Option<BlacklistHit> {
        self.settings.read(|doc| {
            if doc.blacklist.contains(ListKind::Coin, &record.token_address) {
                return Some(BlacklistHit {
                    kind: ListKind::Coin,
                    address: record.token_address.clone(),
                });
            }
            record
                .dev_address
                .as_deref()
                .filter(|dev| doc.blacklist.contains(ListKind::Dev, dev))
                .map(|dev| BlacklistHit {
                    kind: ListKind::Dev,
                    address: dev.to_string(),
                })
        })
    }

    /// Ban a token and its developer. Adding present members is a no-op.
    /// Returns whether either set grew.
    pub fn add(&self, token_address: &str, dev_address: Option<&str>) -> Result<bool, ScreenError> {
        let changed = self
            .settings
            .update(|doc| doc.blacklist.insert(token_address, dev_address))
            .map_err(|e| ScreenError::store(format!("{e:#}")))?;

        if changed {
            info!(token = token_address, dev = ?dev_address, "Blacklist updated");
        }
        Ok(changed)
    }

    /// (coins, devs)
    pub fn sizes(&self) -> (usize, usize) {
        self.settings
            .read(|doc| (doc.blacklist.coins.len(), doc.blacklist.devs.len()))
    }
}
