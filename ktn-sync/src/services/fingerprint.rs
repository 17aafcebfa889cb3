//! Content fingerprints and change detection
//!
//! A sheet is reprocessed only when the SHA-256 of its raw grid differs from
//! the hash stored for its partition. The grid is hashed through its JSON
//! serialization, which keeps cell types (string vs number) and row order.

use crate::sheets::RawGrid;
use ktn_common::db::OrderStore;
use ktn_common::{Error, PartitionKey, Result};
use sha2::{Digest, Sha256};

/// SHA-256 of a raw grid, hex encoded
pub fn fingerprint(grid: &RawGrid) -> Result<String> {
    let canonical = serde_json::to_vec(grid)
        .map_err(|e| Error::Internal(format!("Failed to serialize sheet grid: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Decides whether a partition must be reprocessed
pub struct ChangeDetector {
    store: OrderStore,
}

impl ChangeDetector {
    pub fn new(store: OrderStore) -> Self {
        Self { store }
    }

    /// True when no fingerprint is stored or the stored hash differs.
    ///
    /// A missing fingerprint is the first-ingestion case; any other lookup
    /// failure is returned as an error.
    pub async fn should_reprocess(&self, key: &PartitionKey, new_hash: &str) -> Result<bool> {
        match self.store.get_fingerprint(key).await {
            Ok(stored) => Ok(stored.hash != new_hash),
            Err(e) if e.is_not_found() => {
                tracing::debug!(partition = %key, "No stored fingerprint, first ingestion");
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }
}
