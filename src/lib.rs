//! Procurement cost estimation service
//!
//! Estimates the cost of a procurement request with up to five pricing
//! methods and aggregates them into a single recommendation.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pricing;
pub mod requests;

pub use config::Config;
pub use error::{EstimationError, Result};
pub use pricing::{ComprehensiveEstimation, EstimationMethod, EstimationRequest, PricingEngine, ReferenceData};
