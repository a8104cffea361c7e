//! Procurement request API handlers

use super::models::*;
use super::store::RequestStore;
use crate::api::models::{error_response, ApiError};
use crate::metrics::METRICS;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{error, info};

/// Application state for request handlers
#[derive(Clone)]
pub struct RequestsState {
    pub store: Arc<RequestStore>,
}

/// Create a procurement request
///
/// POST /api/v1/requests
pub async fn create_request(
    State(state): State<RequestsState>,
    Json(request): Json<CreateRequest>,
) -> Result<(StatusCode, Json<CreateRequestResponse>), (StatusCode, Json<ApiError>)> {
    info!("Create request: item={}", request.details.item_name);

    match state.store.create(request) {
        Ok(stored) => {
            METRICS.requests_created.inc();
            Ok((
                StatusCode::CREATED,
                Json(CreateRequestResponse {
                    id: stored.id,
                    status: stored.status,
                }),
            ))
        }
        Err(e) => {
            error!("Request creation failed: {}", e);
            Err(error_response(&e))
        }
    }
}

/// List procurement requests
///
/// GET /api/v1/requests
pub async fn list_requests(State(state): State<RequestsState>) -> Json<RequestListResponse> {
    let requests = state.store.list();
    let total = requests.len();
    Json(RequestListResponse { requests, total })
}

/// Fetch one procurement request
///
/// GET /api/v1/requests/:id
pub async fn get_request(
    State(state): State<RequestsState>,
    Path(id): Path<u64>,
) -> Result<Json<ProcurementRequest>, (StatusCode, Json<ApiError>)> {
    state.store.get(id).map(Json).map_err(|e| error_response(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::models::EstimationRequest;
    use chrono::NaiveDate;

    fn state() -> RequestsState {
        RequestsState {
            store: Arc::new(RequestStore::new()),
        }
    }

    fn payload(quantity: u32) -> CreateRequest {
        CreateRequest {
            details: EstimationRequest::new(
                "שולחן",
                "FUR001",
                quantity,
                NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            ),
            requester: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let state = state();
        let (status, Json(created)) = create_request(State(state.clone()), Json(payload(3)))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.status, RequestStatus::Submitted);

        let Json(fetched) = get_request(State(state.clone()), Path(created.id)).await.unwrap();
        assert_eq!(fetched.details.item_name, "שולחן");

        let Json(list) = list_requests(State(state)).await;
        assert_eq!(list.total, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_zero_quantity() {
        let (status, Json(err)) = create_request(State(state()), Json(payload(0)))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_get_unknown_request() {
        let (status, Json(err)) = get_request(State(state()), Path(404)).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "NOT_FOUND");
    }
}
