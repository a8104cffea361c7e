//! Pricing engine: category resolution, per-method dispatch and aggregation

use chrono::{DateTime, NaiveTime, Utc};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::detector::CategoryDetector;
use super::methods::{estimator_for, EstimationContext};
use super::models::{
    BudgetCheck, CategoryMatch, ComprehensiveEstimation, EstimationMethod, EstimationRequest,
    EstimationResult, MethodFailure, MethodOutcome, ResolvedCategory, RiskLevel,
};
use super::reference::ReferenceData;
use crate::error::{EstimationError, Result};

/// Confidence reported when the request names a known category id
pub const EXPLICIT_CATEGORY_CONFIDENCE: f64 = 100.0;

/// Estimation calculator over injected reference data
#[derive(Debug, Clone)]
pub struct PricingEngine {
    reference: Arc<ReferenceData>,
    detector: CategoryDetector,
}

impl PricingEngine {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self::with_detector(reference, CategoryDetector::default())
    }

    pub fn with_detector(reference: Arc<ReferenceData>, detector: CategoryDetector) -> Self {
        Self {
            reference,
            detector,
        }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn detector(&self) -> &CategoryDetector {
        &self.detector
    }

    /// Use the category label when it is a known id, otherwise run the detector
    pub fn resolve_category(&self, request: &EstimationRequest) -> CategoryMatch {
        self.resolve_labels(&request.item_name, &request.description, &request.category)
    }

    /// Same resolution over the raw text fields
    pub fn resolve_labels(&self, item_name: &str, description: &str, category: &str) -> CategoryMatch {
        if let Some(id) = self.reference.find_category_id(category) {
            return CategoryMatch {
                category_id: id.to_string(),
                confidence: EXPLICIT_CATEGORY_CONFIDENCE,
            };
        }

        let detected = self.detector.detect(item_name, description, category);
        debug!(
            category = %detected.category_id,
            confidence = detected.confidence,
            "Detected category from free text"
        );
        detected
    }

    /// Run one method, propagating its failure
    pub fn calculate(
        &self,
        method: EstimationMethod,
        request: &EstimationRequest,
    ) -> Result<EstimationResult> {
        self.calculate_at(method, request, Utc::now())
    }

    pub fn calculate_at(
        &self,
        method: EstimationMethod,
        request: &EstimationRequest,
        as_of: DateTime<Utc>,
    ) -> Result<EstimationResult> {
        request.validate()?;
        let category = self.resolve_category(request);
        self.run_method(method, request, &category.category_id, as_of)
    }

    fn run_method(
        &self,
        method: EstimationMethod,
        request: &EstimationRequest,
        category_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<EstimationResult> {
        let category = self.reference.category(category_id)?;
        let ctx = EstimationContext {
            request,
            category,
            reference: &self.reference,
            as_of: as_of.date_naive(),
        };
        estimator_for(method).estimate(&ctx)
    }

    /// Run each requested method, collecting successes and failures
    pub fn run_methods<S: AsRef<str>>(
        &self,
        request: &EstimationRequest,
        category_id: &str,
        method_names: &[S],
        as_of: DateTime<Utc>,
    ) -> Vec<MethodOutcome> {
        let mut seen = HashSet::new();
        let mut outcomes = Vec::with_capacity(method_names.len());

        for name in method_names {
            let name = name.as_ref();
            let outcome = match name.parse::<EstimationMethod>() {
                Ok(method) => {
                    if !seen.insert(method) {
                        debug!(method = %method, "Skipping duplicate method");
                        continue;
                    }
                    match self.run_method(method, request, category_id, as_of) {
                        Ok(result) => MethodOutcome::Completed(result),
                        Err(e) => {
                            MethodOutcome::Failed(MethodFailure::new(method.as_str(), e.to_string()))
                        }
                    }
                }
                Err(e) => MethodOutcome::Failed(MethodFailure::new(name, e.to_string())),
            };

            if let MethodOutcome::Failed(failure) = &outcome {
                warn!(
                    method = %failure.method,
                    reason = %failure.reason,
                    "Estimation method failed"
                );
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Aggregate the requested methods into one estimation
    pub fn calculate_comprehensive_estimation<S: AsRef<str>>(
        &self,
        request: &EstimationRequest,
        method_names: &[S],
    ) -> Result<ComprehensiveEstimation> {
        self.calculate_comprehensive_estimation_at(request, method_names, Utc::now())
    }

    pub fn calculate_comprehensive_estimation_at<S: AsRef<str>>(
        &self,
        request: &EstimationRequest,
        method_names: &[S],
        as_of: DateTime<Utc>,
    ) -> Result<ComprehensiveEstimation> {
        request.validate()?;
        if method_names.is_empty() {
            return Err(EstimationError::NoMethodsRequested);
        }

        info!(
            item = %request.item_name,
            quantity = request.quantity,
            methods = method_names.len(),
            "Calculating comprehensive estimation"
        );

        let category_match = self.resolve_category(request);

        let mut estimates = Vec::new();
        let mut failures = Vec::new();
        for outcome in self.run_methods(request, &category_match.category_id, method_names, as_of) {
            match outcome {
                MethodOutcome::Completed(result) => estimates.push(result),
                MethodOutcome::Failed(failure) => failures.push(failure),
            }
        }

        let recommended = match select_recommended(&estimates) {
            Some(result) => result.clone(),
            None => return Err(EstimationError::AllMethodsFailed(failures)),
        };

        // At least one method found the category, so the lookup succeeds here
        let category = self.reference.category(&category_match.category_id)?;
        let overall_confidence = overall_confidence(&estimates);
        let total_savings_opportunity = savings_opportunity(&estimates);
        let risk_level = risk_level(&estimates);
        let budget = request
            .max_funding
            .map(|ceiling| BudgetCheck::new(ceiling, recommended.total_cost));

        info!(
            recommended = %recommended.method,
            total_cost = recommended.total_cost,
            completed = estimates.len(),
            failed = failures.len(),
            risk_level = risk_level.as_str(),
            "Comprehensive estimation complete"
        );

        Ok(ComprehensiveEstimation {
            category: ResolvedCategory {
                id: category.id.clone(),
                name: category.name.clone(),
                detection_confidence: category_match.confidence,
            },
            estimates,
            failures,
            recommended,
            overall_confidence,
            total_savings_opportunity,
            risk_level,
            budget,
            generated_at: as_of,
        })
    }
}

/// Highest accuracy × confidence; the earliest result wins ties
pub fn select_recommended(estimates: &[EstimationResult]) -> Option<&EstimationResult> {
    let mut best: Option<&EstimationResult> = None;
    for candidate in estimates {
        if best.map_or(true, |current| candidate.selection_score() > current.selection_score()) {
            best = Some(candidate);
        }
    }
    best
}

/// Mean of confidence × accuracy / 100, plus up to 20 points for method count, capped at 100
pub fn overall_confidence(estimates: &[EstimationResult]) -> f64 {
    if estimates.is_empty() {
        return 0.0;
    }

    let count = estimates.len() as f64;
    let mean = estimates
        .iter()
        .map(|e| e.confidence * e.accuracy / 100.0)
        .sum::<f64>()
        / count;
    let bonus = (count * 5.0).min(20.0);

    (mean + bonus).min(100.0)
}

/// Spread between the most and least expensive estimates
pub fn savings_opportunity(estimates: &[EstimationResult]) -> f64 {
    let totals = estimates.iter().map(|e| e.total_cost);
    let max = totals.clone().fold(f64::NEG_INFINITY, f64::max);
    let min = totals.fold(f64::INFINITY, f64::min);

    if estimates.is_empty() {
        0.0
    } else {
        max - min
    }
}

/// Distinct risks across all results, averaged per result
pub fn risk_level(estimates: &[EstimationResult]) -> RiskLevel {
    if estimates.is_empty() {
        return RiskLevel::Low;
    }

    let distinct: BTreeSet<&str> = estimates
        .iter()
        .flat_map(|e| e.risks.iter().map(String::as_str))
        .collect();

    RiskLevel::from_average(distinct.len() as f64 / estimates.len() as f64)
}

/// Midnight UTC on the given date, for reproducible calculations
pub fn as_of_date(date: chrono::NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
