//! In-memory procurement request store

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use super::models::*;
use crate::error::{EstimationError, Result};
use crate::pricing::models::{ComprehensiveEstimation, EstimationRequest};

/// Requests keyed by id; ids come from a monotonically increasing counter
pub struct RequestStore {
    requests: DashMap<u64, ProcurementRequest>,
    next_id: AtomicU64,
}

impl RequestStore {
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Store pre-loaded with demo requests
    pub fn seeded() -> Self {
        let store = Self::new();
        for request in demo_requests() {
            // Demo payloads are valid by construction
            if let Err(e) = store.create(request) {
                debug!("Skipping demo request: {}", e);
            }
        }
        store
    }

    pub fn create(&self, request: CreateRequest) -> Result<ProcurementRequest> {
        request.details.validate()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = ProcurementRequest {
            id,
            details: request.details,
            requester: request.requester,
            status: RequestStatus::Submitted,
            created_at: Utc::now(),
            latest_estimate: None,
        };

        info!("Procurement request created: id={}, item={}", id, stored.details.item_name);
        self.requests.insert(id, stored.clone());
        Ok(stored)
    }

    pub fn get(&self, id: u64) -> Result<ProcurementRequest> {
        self.requests
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(EstimationError::RequestNotFound(id))
    }

    /// All requests ordered by id
    pub fn list(&self) -> Vec<ProcurementRequest> {
        let mut requests: Vec<ProcurementRequest> =
            self.requests.iter().map(|entry| entry.value().clone()).collect();
        requests.sort_by_key(|r| r.id);
        requests
    }

    /// Attach the recommended estimate to a request
    pub fn record_estimation(
        &self,
        id: u64,
        estimation: &ComprehensiveEstimation,
    ) -> Result<ProcurementRequest> {
        let mut entry = self
            .requests
            .get_mut(&id)
            .ok_or(EstimationError::RequestNotFound(id))?;

        entry.status = RequestStatus::Estimated;
        entry.latest_estimate = Some(EstimateSummary::from(estimation));
        debug!(
            "Recorded estimation for request {}: {} via {}",
            id, estimation.recommended.total_cost, estimation.recommended.method
        );

        Ok(entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_requests() -> Vec<CreateRequest> {
    let target = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap_or(NaiveDate::MAX);

    vec![
        CreateRequest {
            details: EstimationRequest::new("מחשבים ניידים לצוות פיתוח", "IT001", 25, target)
                .with_description("מחשבים ניידים מתקדמים עם 32GB זיכרון")
                .with_specifications(serde_json::json!({
                    "מעבד": "Intel i7",
                    "זיכרון": "32GB",
                    "אחסון": "1TB SSD"
                }))
                .with_max_funding(180_000.0),
            requester: "אגף טכנולוגיות".to_string(),
        },
        CreateRequest {
            details: EstimationRequest::new("כסאות משרדיים", "ריהוט", 40, target)
                .with_description("כסא ארגונומי פשוט"),
            requester: "מנהלה".to_string(),
        },
    ]
}
