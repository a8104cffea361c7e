//! HTTP API for estimation, reference data and procurement requests

pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::EstimationState;
pub use models::{error_response, ApiError};
pub use routes::{build_router, init_state};
