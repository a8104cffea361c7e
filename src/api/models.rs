//! Shared API payloads and error mapping

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::EstimationError;
use crate::pricing::models::{CategoryMatch, EstimationRequest, ProcurementCategory, SupplierPerformance};

pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ESTIMATION_FAILED: &str = "ESTIMATION_FAILED";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Map a crate error onto an HTTP status and error body
pub fn error_response(err: &EstimationError) -> (StatusCode, Json<ApiError>) {
    let (status, code) = match err {
        EstimationError::InvalidRequest(_)
        | EstimationError::UnknownMethod(_)
        | EstimationError::NoMethodsRequested => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
        EstimationError::RequestNotFound(_) | EstimationError::CategoryNotFound(_) => {
            (StatusCode::NOT_FOUND, error_codes::NOT_FOUND)
        }
        EstimationError::AllMethodsFailed(_) | EstimationError::NoHistoricalData(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, error_codes::ESTIMATION_FAILED)
        }
        EstimationError::Configuration(_) | EstimationError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR)
        }
    };

    (status, Json(ApiError::new(code, err.to_string())))
}

/// Estimate a stored request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationApiRequest {
    pub request_id: u64,
    #[serde(default)]
    pub selected_methods: Vec<String>,
}

/// Estimate an ad-hoc request without storing it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewApiRequest {
    pub request: EstimationRequest,
    #[serde(default)]
    pub selected_methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectCategoryRequest {
    pub item_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectCategoryResponse {
    #[serde(flatten)]
    pub detected: CategoryMatch,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryListResponse {
    pub categories: Vec<ProcurementCategory>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSupplier {
    pub rank: usize,
    pub composite_score: f64,
    #[serde(flatten)]
    pub supplier: SupplierPerformance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierListResponse {
    pub suppliers: Vec<RankedSupplier>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
