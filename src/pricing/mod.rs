//! Procurement cost estimation
//!
//! Five deterministic estimation methods over static category metadata,
//! historical procurements and supplier performance:
//! - Market-based: fixed unit price scaled by category multiplier and volatility
//! - Analogous: similarity-weighted, inflation-adjusted past procurements
//! - Parametric: hard-coded linear model per category
//! - Bottom-up: template breakdown into materials, labor and overheads
//! - Expert judgment: benchmark price with heuristic multipliers
//!
//! [`PricingEngine`] runs any subset of them and aggregates the results.

pub mod cache;
pub mod detector;
pub mod engine;
pub mod methods;
pub mod models;
pub mod reference;

pub use cache::EstimationCache;
pub use detector::{CategoryDetector, DetectionRule};
pub use engine::PricingEngine;
pub use methods::{Estimator, EstimationContext};
pub use models::{
    BudgetCheck, CategoryMatch, ComprehensiveEstimation, CostBreakdown, CostLineItem,
    EstimationMethod, EstimationRequest, EstimationResult, HistoricalProcurement, MethodFailure,
    MethodOutcome, ProcurementCategory, RiskLevel, SupplierPerformance,
};
pub use reference::ReferenceData;
