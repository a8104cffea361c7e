//! Data models for procurement requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pricing::models::{ComprehensiveEstimation, EstimationMethod, EstimationRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Submitted,
    Estimated,
}

/// Stored procurement request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementRequest {
    pub id: u64,
    #[serde(flatten)]
    pub details: EstimationRequest,
    pub requester: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_estimate: Option<EstimateSummary>,
}

/// Outcome of the most recent estimation of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateSummary {
    pub method: EstimationMethod,
    pub total_cost: f64,
    pub overall_confidence: f64,
    pub estimated_at: DateTime<Utc>,
}

impl From<&ComprehensiveEstimation> for EstimateSummary {
    fn from(estimation: &ComprehensiveEstimation) -> Self {
        Self {
            method: estimation.recommended.method,
            total_cost: estimation.recommended.total_cost,
            overall_confidence: estimation.overall_confidence,
            estimated_at: estimation.generated_at,
        }
    }
}

/// Request creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    #[serde(flatten)]
    pub details: EstimationRequest,
    #[serde(default)]
    pub requester: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestResponse {
    pub id: u64,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestListResponse {
    pub requests: Vec<ProcurementRequest>,
    pub total: usize,
}
