//! Line-item → billing-variant mapping.
//!
//! The map is a JSON file of `key → variant id`, loaded once and
//! rewritten whenever an unseen key is auto-inserted, so a restart never
//! re-learns (or re-logs) the same unmapped product.
//!
//! Keys come in two forms. The structured `kind:external_id` token is
//! the primary form, stable across description edits. Normalized
//! free-text descriptions are kept as a legacy-compatibility input, with
//! a deterministic substring tier behind them as an explicit best-effort
//! fallback.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::SyncError;
use crate::identity::normalize_name;
use crate::model::ItemCategory;

/// Structured key for a line item: `"product:123"`, or `"unknown:0"`
/// when the Source Ledger gave no category reference.
pub fn structured_key(category: Option<&ItemCategory>) -> String {
    match category {
        Some(c) => format!("{}:{}", c.kind.as_str(), c.external_id),
        None => "unknown:0".to_string(),
    }
}

/// File-backed, append-only variant mapping. Lookup is total and
/// idempotent: the same key always yields the same variant after its
/// first insertion.
#[derive(Debug)]
pub struct VariantMap {
    path: PathBuf,
    entries: BTreeMap<String, i64>,
    generic_id: i64,
}

impl VariantMap {
    /// Load the mapping from `path`. A missing file is an empty map,
    /// not an error.
    pub fn load(path: impl Into<PathBuf>, generic_id: i64) -> Result<Self, SyncError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| SyncError::Config(format!("bad variant map {}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(SyncError::Config(format!(
                    "cannot read variant map {}: {e}",
                    path.display()
                )))
            }
        };
        Ok(Self { path, entries, generic_id })
    }

    /// In-memory map for tests and dry runs.
    pub fn in_memory(entries: BTreeMap<String, i64>, generic_id: i64) -> Self {
        Self { path: PathBuf::new(), entries, generic_id }
    }

    pub fn generic_id(&self) -> i64 {
        self.generic_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a line item to a variant id. Total function:
    /// 1. exact structured key;
    /// 2. exact legacy free-text key (normalized description);
    /// 3. best-effort substring tier over stored keys (deterministic:
    ///    BTreeMap order, shortest stored key wins), logged;
    /// 4. auto-insert the key bound to the generic variant, persist
    ///    before returning, and log for curation.
    pub fn resolve(&mut self, category: Option<&ItemCategory>, description: &str) -> i64 {
        let skey = structured_key(category);
        if category.is_some() {
            if let Some(id) = self.entries.get(&skey) {
                return *id;
            }
        }

        let text_key = normalize_name(description);
        if !text_key.is_empty() {
            if let Some(id) = self.entries.get(&text_key) {
                return *id;
            }
            if let Some((stored, id)) = self.substring_match(&text_key) {
                warn!(query = %text_key, matched = %stored, variant = id,
                      "variant resolved via substring fallback");
                return id;
            }
        }

        // Unseen: remember it under the most stable key available.
        let insert_key = if category.is_some() { skey } else { text_key };
        let insert_key = if insert_key.is_empty() { "unknown:0".to_string() } else { insert_key };
        let id = self.generic_id;
        self.entries.insert(insert_key.clone(), id);
        if let Err(e) = self.persist() {
            warn!(key = %insert_key, error = %e, "variant map persist failed");
        }
        warn!(key = %insert_key, variant = id, "unmapped item bound to generic variant; curate later");
        id
    }

    /// Shortest stored key where either side contains the other.
    fn substring_match(&self, query: &str) -> Option<(String, i64)> {
        self.entries
            .iter()
            .filter(|(k, _)| k.contains(query) || query.contains(k.as_str()))
            .min_by_key(|(k, _)| k.len())
            .map(|(k, v)| (k.clone(), *v))
    }

    fn persist(&self) -> Result<(), SyncError> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| SyncError::Config(format!("variant map serialize: {e}")))?;
        std::fs::write(&self.path, json)
            .map_err(|e| SyncError::Config(format!("variant map write {}: {e}", self.path.display())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
