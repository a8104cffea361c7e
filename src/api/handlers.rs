//! Estimation and reference-data API handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::api::models::*;
use crate::error::{EstimationError, Result};
use crate::metrics::METRICS;
use crate::pricing::{ComprehensiveEstimation, EstimationCache, EstimationRequest, PricingEngine};
use crate::requests::RequestStore;
use crate::time_operation;

/// Application state for estimation handlers
#[derive(Clone)]
pub struct EstimationState {
    pub engine: Arc<PricingEngine>,
    pub requests: Arc<RequestStore>,
    pub cache: Arc<EstimationCache>,
    /// Used when a caller selects no methods
    pub default_methods: Arc<Vec<String>>,
}

impl EstimationState {
    fn methods_or_default<'a>(&'a self, selected: &'a [String]) -> &'a [String] {
        if selected.is_empty() {
            self.default_methods.as_slice()
        } else {
            selected
        }
    }

    /// Run the engine through the cache
    async fn estimate(
        &self,
        request: &EstimationRequest,
        selected: &[String],
    ) -> Result<ComprehensiveEstimation> {
        request.validate()?;
        let methods = self.methods_or_default(selected);
        let now = Utc::now();
        let key = EstimationCache::fingerprint(request, methods, now.date_naive())?;

        if let Some(cached) = self.cache.get(&key).await {
            debug!("Estimation cache hit: {}", key);
            METRICS.record_cache(true);
            return Ok(cached);
        }
        METRICS.record_cache(false);

        let result = time_operation!(
            METRICS.estimation_duration,
            "engine",
            self.engine
                .calculate_comprehensive_estimation_at(request, methods, now)
        );

        match &result {
            Ok(estimation) => {
                METRICS.record_methods(&estimation.estimates, &estimation.failures);
                METRICS.record_detection(&estimation.category.id);
                self.cache.insert(key, estimation.clone()).await;
            }
            Err(EstimationError::AllMethodsFailed(failures)) => {
                METRICS.record_methods(&[], failures);
            }
            Err(_) => {}
        }

        result
    }
}

fn observe(endpoint: &str, start: Instant, success: bool) {
    METRICS.record_estimation(success);
    METRICS
        .estimation_duration
        .with_label_values(&[endpoint])
        .observe(start.elapsed().as_secs_f64());
}

/// Liveness probe
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus scrape endpoint
///
/// GET /metrics
pub async fn metrics() -> String {
    METRICS.export_prometheus()
}

/// List procurement categories
///
/// GET /api/v1/categories
pub async fn list_categories(State(state): State<EstimationState>) -> Json<CategoryListResponse> {
    let categories: Vec<_> = state.engine.reference().categories().cloned().collect();
    let total = categories.len();
    Json(CategoryListResponse { categories, total })
}

/// Detect a category from free text
///
/// POST /api/v1/categories/detect
pub async fn detect_category(
    State(state): State<EstimationState>,
    Json(request): Json<DetectCategoryRequest>,
) -> std::result::Result<Json<DetectCategoryResponse>, (StatusCode, Json<ApiError>)> {
    if request.item_name.trim().is_empty()
        && request.description.trim().is_empty()
        && request.category.trim().is_empty()
    {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                error_codes::VALIDATION_ERROR,
                "At least one of itemName, description or category is required",
            )),
        ));
    }

    let detected = state
        .engine
        .resolve_labels(&request.item_name, &request.description, &request.category);
    METRICS.record_detection(&detected.category_id);

    let category_name = state
        .engine
        .reference()
        .category(&detected.category_id)
        .ok()
        .map(|c| c.name.clone());

    Ok(Json(DetectCategoryResponse {
        detected,
        category_name,
    }))
}

/// Suppliers ranked by composite performance
///
/// GET /api/v1/suppliers
pub async fn list_suppliers(State(state): State<EstimationState>) -> Json<SupplierListResponse> {
    let suppliers: Vec<RankedSupplier> = state
        .engine
        .reference()
        .ranked_suppliers()
        .into_iter()
        .enumerate()
        .map(|(i, supplier)| RankedSupplier {
            rank: i + 1,
            composite_score: (supplier.composite_score() * 100.0).round() / 100.0,
            supplier: supplier.clone(),
        })
        .collect();
    let total = suppliers.len();
    Json(SupplierListResponse { suppliers, total })
}

/// Estimate a stored procurement request
///
/// POST /api/v1/estimations
pub async fn create_estimation(
    State(state): State<EstimationState>,
    Json(request): Json<EstimationApiRequest>,
) -> std::result::Result<Json<ComprehensiveEstimation>, (StatusCode, Json<ApiError>)> {
    let start = Instant::now();

    info!(
        "Estimation request: request_id={}, methods={:?}",
        request.request_id, request.selected_methods
    );

    let stored = match state.requests.get(request.request_id) {
        Ok(stored) => stored,
        Err(e) => {
            observe("estimate", start, false);
            return Err(error_response(&e));
        }
    };

    let estimation = match state.estimate(&stored.details, &request.selected_methods).await {
        Ok(estimation) => estimation,
        Err(e) => {
            observe("estimate", start, false);
            error!("Estimation failed for request {}: {}", request.request_id, e);
            return Err(error_response(&e));
        }
    };

    if let Err(e) = state.requests.record_estimation(stored.id, &estimation) {
        error!("Failed to record estimation on request {}: {}", stored.id, e);
    }

    observe("estimate", start, true);
    Ok(Json(estimation))
}

/// Estimate an ad-hoc request without storing it
///
/// POST /api/v1/estimations/preview
pub async fn preview_estimation(
    State(state): State<EstimationState>,
    Json(request): Json<PreviewApiRequest>,
) -> std::result::Result<Json<ComprehensiveEstimation>, (StatusCode, Json<ApiError>)> {
    let start = Instant::now();

    info!("Estimation preview: item={}", request.request.item_name);

    match state.estimate(&request.request, &request.selected_methods).await {
        Ok(estimation) => {
            observe("preview", start, true);
            Ok(Json(estimation))
        }
        Err(e) => {
            observe("preview", start, false);
            error!("Estimation preview failed: {}", e);
            Err(error_response(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{EstimationMethod, ReferenceData, RiskLevel};
    use crate::requests::{CreateRequest, RequestStatus};
    use chrono::{Duration, NaiveDate};
    use std::time::Duration as StdDuration;

    fn state() -> EstimationState {
        EstimationState {
            engine: Arc::new(PricingEngine::new(Arc::new(ReferenceData::seeded()))),
            requests: Arc::new(RequestStore::new()),
            cache: Arc::new(EstimationCache::new(100, StdDuration::from_secs(60))),
            default_methods: Arc::new(vec!["market-based".to_string(), "bottom-up".to_string()]),
        }
    }

    fn far_target() -> NaiveDate {
        Utc::now().date_naive() + Duration::days(120)
    }

    fn store_request(state: &EstimationState, category: &str, quantity: u32) -> u64 {
        state
            .requests
            .create(CreateRequest {
                details: EstimationRequest::new("פריט", category, quantity, far_target()),
                requester: String::new(),
            })
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_estimation_records_result() {
        let state = state();
        let id = store_request(&state, "IT001", 25);

        let Json(estimation) = create_estimation(
            State(state.clone()),
            Json(EstimationApiRequest {
                request_id: id,
                selected_methods: vec!["market-based".to_string()],
            }),
        )
        .await
        .unwrap();

        assert_eq!(estimation.recommended.method, EstimationMethod::MarketBased);
        assert_eq!(estimation.recommended.breakdown.shipping, 1250.0);

        let stored = state.requests.get(id).unwrap();
        assert_eq!(stored.status, RequestStatus::Estimated);
        assert_eq!(stored.latest_estimate.unwrap().total_cost, estimation.recommended.total_cost);
    }

    #[tokio::test]
    async fn test_default_methods_when_none_selected() {
        let state = state();
        let id = store_request(&state, "FUR001", 4);

        let Json(estimation) = create_estimation(
            State(state),
            Json(EstimationApiRequest {
                request_id: id,
                selected_methods: vec![],
            }),
        )
        .await
        .unwrap();

        let methods: Vec<_> = estimation.estimates.iter().map(|e| e.method).collect();
        assert_eq!(methods, vec![EstimationMethod::MarketBased, EstimationMethod::BottomUp]);
    }

    #[tokio::test]
    async fn test_unknown_request_id() {
        let (status, Json(err)) = create_estimation(
            State(state()),
            Json(EstimationApiRequest {
                request_id: 999,
                selected_methods: vec![],
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, error_codes::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_all_methods_failed_is_unprocessable() {
        let state = state();
        let id = store_request(&state, "SW001", 2);

        let (status, Json(err)) = create_estimation(
            State(state),
            Json(EstimationApiRequest {
                request_id: id,
                selected_methods: vec!["analogous".to_string()],
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, error_codes::ESTIMATION_FAILED);
        assert!(err.message.contains("SW001"));
    }

    #[tokio::test]
    async fn test_preview_uses_cache() {
        let state = state();
        let request = EstimationRequest::new("מחשב נייד", "", 3, far_target());
        let payload = PreviewApiRequest {
            request,
            selected_methods: vec!["market_based".to_string(), "analogous".to_string()],
        };

        let Json(first) = preview_estimation(State(state.clone()), Json(payload.clone()))
            .await
            .unwrap();
        let Json(second) = preview_estimation(State(state.clone()), Json(payload))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.category.id, "IT001");
        assert_eq!(first.category.detection_confidence, 95.0);
        assert_eq!(state.cache.len().await, 1);
        assert!(state.requests.is_empty());
    }

    #[tokio::test]
    async fn test_preview_rejects_invalid_request() {
        let payload = PreviewApiRequest {
            request: EstimationRequest::new("", "IT001", 1, far_target()),
            selected_methods: vec![],
        };
        let (status, _) = preview_estimation(State(state()), Json(payload))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_detect_category() {
        let Json(response) = detect_category(
            State(state()),
            Json(DetectCategoryRequest {
                item_name: "Dell server".to_string(),
                description: String::new(),
                category: String::new(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.detected.category_id, "IT002");
        assert_eq!(response.category_name.as_deref(), Some("שרתים ותשתיות"));
    }

    #[tokio::test]
    async fn test_detect_category_requires_text() {
        let (status, _) = detect_category(
            State(state()),
            Json(DetectCategoryRequest {
                item_name: " ".to_string(),
                description: String::new(),
                category: String::new(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reference_listings() {
        let state = state();
        let Json(categories) = list_categories(State(state.clone())).await;
        assert_eq!(categories.total, 6);

        let Json(suppliers) = list_suppliers(State(state)).await;
        assert_eq!(suppliers.total, 4);
        assert_eq!(suppliers.suppliers[0].rank, 1);
        assert_eq!(suppliers.suppliers[0].supplier.id, "SUP003");
    }

    #[tokio::test]
    async fn test_detect_category_honors_explicit_id() {
        let Json(response) = detect_category(
            State(state()),
            Json(DetectCategoryRequest {
                item_name: String::new(),
                description: String::new(),
                category: "IT001".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.detected.category_id, "IT001");
        assert_eq!(response.detected.confidence, 100.0);
    }

    #[tokio::test]
    async fn test_invalid_request_skips_cache() {
        let state = state();
        let request = EstimationRequest::new("מחשב", "IT001", 0, far_target());

        let result = state.estimate(&request, &["market-based".to_string()]).await;

        assert!(matches!(result, Err(EstimationError::InvalidRequest(_))));
        assert_eq!(state.cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_method_outcome_series_bounded() {
        let state = state();
        let id = store_request(&state, "IT001", 5);

        for i in 0..50 {
            create_estimation(
                State(state.clone()),
                Json(EstimationApiRequest {
                    request_id: id,
                    selected_methods: vec!["market-based".to_string(), format!("junk-{}", i)],
                }),
            )
            .await
            .unwrap();
        }

        let series = METRICS
            .export_prometheus()
            .lines()
            .filter(|line| line.starts_with("estimation_method_outcomes_total{"))
            .count();
        // Five methods and `unknown`, each with success and error
        assert!(series <= 12, "{} series", series);
    }

    #[tokio::test]
    async fn test_health() {
        let Json(health) = health().await;
        assert_eq!(health.status, "ok");
    }

    #[test]
    fn test_risk_level_serialization() {
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"medium\"");
    }
}
