//! Router assembly for the estimation service

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    api::handlers::{self, EstimationState},
    config::Config,
    pricing::{EstimationCache, PricingEngine, ReferenceData},
    requests::{self, RequestStore, RequestsState},
};

/// Build estimation, reference-data and probe routes
pub fn build_estimation_routes(state: EstimationState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/api/v1/categories", get(handlers::list_categories))
        .route("/api/v1/categories/detect", post(handlers::detect_category))
        .route("/api/v1/suppliers", get(handlers::list_suppliers))
        .route("/api/v1/estimations", post(handlers::create_estimation))
        .route("/api/v1/estimations/preview", post(handlers::preview_estimation))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

/// Build procurement request routes
pub fn build_request_routes(state: RequestsState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(
            "/api/v1/requests",
            post(requests::create_request).get(requests::list_requests),
        )
        .route("/api/v1/requests/:id", get(requests::get_request))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

/// Build the complete application router
pub fn build_router(
    estimation_state: EstimationState,
    requests_state: RequestsState,
    config: &Config,
) -> Router {
    let max_body_bytes = config.server.max_body_bytes;

    build_estimation_routes(estimation_state, max_body_bytes)
        .merge(build_request_routes(requests_state, max_body_bytes))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Initialize shared state from configuration
///
/// Both states share one request store so estimations land on stored requests.
pub fn init_state(config: &Config, store: RequestStore) -> (EstimationState, RequestsState) {
    let reference = Arc::new(ReferenceData::seeded());
    let engine = Arc::new(PricingEngine::new(reference));
    let store = Arc::new(store);
    let cache = Arc::new(EstimationCache::new(
        config.estimation.cache_capacity,
        config.estimation.cache_ttl(),
    ));

    info!(
        "Estimation state ready: {} categories, {} stored requests, cache capacity {}",
        engine.reference().categories().count(),
        store.len(),
        config.estimation.cache_capacity
    );

    let estimation_state = EstimationState {
        engine,
        requests: store.clone(),
        cache,
        default_methods: Arc::new(config.estimation.default_methods.clone()),
    };
    let requests_state = RequestsState { store };

    (estimation_state, requests_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router() -> Router {
        let config = Config::default();
        let (estimation, requests) = init_state(&config, RequestStore::seeded());
        build_router(estimation, requests, &config)
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_seeded_requests_listed() {
        let response = router()
            .oneshot(Request::get("/api/v1/requests").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["total"], 2);
    }

    #[tokio::test]
    async fn test_body_limit_enforced() {
        let mut config = Config::default();
        config.server.max_body_bytes = 16;
        let (estimation, requests) = init_state(&config, RequestStore::new());
        let app = build_router(estimation, requests, &config);

        let payload = serde_json::json!({"requestId": 1, "selectedMethods": ["market-based"]}).to_string();
        let response = app
            .oneshot(
                Request::post("/api/v1/estimations")
                    .header("content-type", "application/json")
                    .header("content-length", payload.len())
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
