//! Persistence layer.
//!
//! - `SettingsStore`: the mutable JSON document holding filter thresholds
//!   and the blacklist, rewritten atomically on every mutation.
//! - `blacklist`: the blacklist registry view over that document.
//! - `metrics`: the SQLite time-series of token observations.

pub mod blacklist;
pub mod metrics;

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::types::{Blacklist, FilterConfig, StateDocument};

/// Default state document path.
pub const DEFAULT_STATE_FILE: &str = "rugscreen_state.json";

/// Save the state document with write-temp-then-rename, so a crash
/// mid-write leaves the previous document intact.
pub fn save_document(doc: &StateDocument, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(doc).context("Failed to serialise state document")?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let write_tmp = || -> Result<()> {
        let mut file = File::create(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", tmp.display()))?;
        Ok(())
    };

    if let Err(e) = write_tmp() {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path).with_context(|| {
        let _ = fs::remove_file(&tmp);
        format!("Failed to replace state document {}", path.display())
    })?;

    debug!(
        path = %path.display(),
        coins = doc.blacklist.coins.len(),
        devs = doc.blacklist.devs.len(),
        "State document saved"
    );
    Ok(())
}

/// Load the state document. Returns None if the file doesn't exist.
pub fn load_document(path: &Path) -> Result<Option<StateDocument>> {
    if !path.exists() {
        info!(path = %path.display(), "No state document found");
        return Ok(None);
    }

    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state from {}", path.display()))?;
    let doc: StateDocument = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse state from {}", path.display()))?;

    info!(
        path = %path.display(),
        coins = doc.blacklist.coins.len(),
        devs = doc.blacklist.devs.len(),
        "State document loaded"
    );
    Ok(Some(doc))
}

// ---------------------------------------------------------------------------
// Settings store
// ---------------------------------------------------------------------------

/// Process-wide owner of the state document.
///
/// Reads hand out snapshots; mutations are applied to a copy, flushed to
/// disk, and only then made visible. A failed flush leaves memory and disk
/// unchanged.
pub struct SettingsStore {
    path: PathBuf,
    doc: Mutex<StateDocument>,
}

impl SettingsStore {
    /// Open the document at `path`, seeding it with `seed_filters` and an
    /// empty blacklist if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>, seed_filters: FilterConfig) -> Result<Self> {
        let path = path.into();
        let doc = match load_document(&path)? {
            Some(doc) => doc,
            None => {
                let doc = StateDocument {
                    filters: seed_filters,
                    ..StateDocument::default()
                };
                save_document(&doc, &path)?;
                info!(path = %path.display(), "Seeded fresh state document");
                doc
            }
        };
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current filters.
    pub fn filters(&self) -> FilterConfig {
        self.lock().filters.clone()
    }

    /// Snapshot of the current blacklist.
    pub fn blacklist(&self) -> Blacklist {
        self.lock().blacklist.clone()
    }

    /// Full replace of the filter section.
    pub fn replace_filters(&self, filters: FilterConfig) -> Result<()> {
        self.update(|doc| {
            doc.filters = filters;
            true
        })
        .map(|_| ())
    }

    /// Read under the lock without cloning the document.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&StateDocument) -> R) -> R {
        f(&self.lock())
    }

    /// Apply `f` to a copy of the document; if it reports a change, persist
    /// the copy and publish it. Returns whether anything changed.
    pub(crate) fn update(&self, f: impl FnOnce(&mut StateDocument) -> bool) -> Result<bool> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        if !f(&mut next) {
            return Ok(false);
        }
        save_document(&next, &self.path)?;
        *guard = next;
        Ok(true)
    }

    fn lock(&self) -> MutexGuard<'_, StateDocument> {
        self.doc.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
