//! TTL cache for comprehensive estimations
//!
//! Keys are SHA-256 fingerprints of the request, the canonical method list and
//! the calculation date, so identical inputs on the same day share an entry.

use chrono::NaiveDate;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::time::Duration;

use super::models::{ComprehensiveEstimation, EstimationMethod, EstimationRequest};
use crate::error::Result;

pub struct EstimationCache {
    entries: Cache<String, ComprehensiveEstimation>,
}

impl EstimationCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Stable key for a request, its methods and the calculation date
    pub fn fingerprint<S: AsRef<str>>(
        request: &EstimationRequest,
        method_names: &[S],
        as_of: NaiveDate,
    ) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(request)?);
        hasher.update(b"|");

        for name in method_names {
            let name = name.as_ref();
            // Aliases of the same method share a key
            let canonical = name
                .parse::<EstimationMethod>()
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|_| name.trim().to_lowercase());
            hasher.update(canonical.as_bytes());
            hasher.update(b",");
        }

        hasher.update(b"|");
        hasher.update(as_of.to_string().as_bytes());

        Ok(hex::encode(hasher.finalize()))
    }

    pub async fn get(&self, key: &str) -> Option<ComprehensiveEstimation> {
        self.entries.get(key).await
    }

    pub async fn insert(&self, key: String, estimation: ComprehensiveEstimation) {
        self.entries.insert(key, estimation).await;
    }

    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}
