//! Data models for the pricing engine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EstimationError, Result};

/// Input to the calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationRequest {
    pub item_name: String,
    #[serde(default)]
    pub description: String,
    /// Free-text category label or a category id
    #[serde(default)]
    pub category: String,
    pub quantity: u32,
    #[serde(default)]
    pub specifications: serde_json::Value,
    pub target_date: NaiveDate,
    /// Estimated maximum funding (EMF) ceiling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_funding: Option<f64>,
}

impl EstimationRequest {
    pub fn new(item_name: impl Into<String>, category: impl Into<String>, quantity: u32, target_date: NaiveDate) -> Self {
        Self {
            item_name: item_name.into(),
            description: String::new(),
            category: category.into(),
            quantity,
            specifications: serde_json::Value::Null,
            target_date,
            max_funding: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_specifications(mut self, specifications: serde_json::Value) -> Self {
        self.specifications = specifications;
        self
    }

    pub fn with_max_funding(mut self, max_funding: f64) -> Self {
        self.max_funding = Some(max_funding);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.item_name.trim().is_empty() {
            return Err(EstimationError::InvalidRequest(
                "Item name cannot be empty".to_string(),
            ));
        }

        if self.quantity == 0 {
            return Err(EstimationError::InvalidRequest(
                "Quantity must be a positive integer".to_string(),
            ));
        }

        if let Some(max_funding) = self.max_funding {
            if !(max_funding.is_finite() && max_funding > 0.0) {
                return Err(EstimationError::InvalidRequest(
                    "Maximum funding must be a positive amount".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Lower-cased description plus flattened specifications, used for keyword checks
    pub fn specification_text(&self) -> String {
        let specs = match &self.specifications {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        format!("{} {}", self.description, specs).to_lowercase()
    }
}

/// Static category metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementCategory {
    pub id: String,
    pub name: String,
    pub pricing_multiplier: f64,
    pub risk_factor: f64,
    pub market_volatility: f64,
    pub avg_delivery_days: u32,
    pub expected_fields: Vec<String>,
}

/// Past procurement used by the analogous method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalProcurement {
    pub id: String,
    pub category: String,
    pub item_name: String,
    pub quantity: u32,
    pub actual_cost: f64,
    pub estimated_cost: f64,
    pub variance_percent: f64,
    pub supplier_id: String,
    pub completion_date: NaiveDate,
    pub satisfaction_score: f64,
    pub lessons: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPerformance {
    pub id: String,
    pub name: String,
    /// 0-5
    pub rating: f64,
    pub avg_delivery_days: u32,
    /// 0-100
    pub reliability_score: f64,
    /// 0-100
    pub cost_efficiency: f64,
    /// 0-5
    pub quality_score: f64,
    pub total_orders: u32,
    /// Percent of orders delivered on time
    pub on_time_delivery: f64,
    /// Percent of delivered units found defective
    pub defect_rate: f64,
}

impl SupplierPerformance {
    /// Composite 0-100 score used for ranking
    pub fn composite_score(&self) -> f64 {
        let rating = self.rating / 5.0 * 100.0;
        let quality = self.quality_score / 5.0 * 100.0;
        let defects = (100.0 - self.defect_rate * 10.0).max(0.0);

        rating * 0.3
            + self.reliability_score * 0.25
            + self.on_time_delivery * 0.2
            + quality * 0.15
            + defects * 0.1
    }
}

/// Hard-coded linear cost model for the parametric method
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionModel {
    pub intercept: f64,
    pub quantity_coefficient: f64,
    pub complexity_coefficient: f64,
    /// Nominal, not computed
    pub r_squared: f64,
}

/// The five estimation methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimationMethod {
    MarketBased,
    Analogous,
    Parametric,
    BottomUp,
    ExpertJudgment,
}

impl EstimationMethod {
    pub const ALL: [EstimationMethod; 5] = [
        EstimationMethod::MarketBased,
        EstimationMethod::Analogous,
        EstimationMethod::Parametric,
        EstimationMethod::BottomUp,
        EstimationMethod::ExpertJudgment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketBased => "market-based",
            Self::Analogous => "analogous",
            Self::Parametric => "parametric",
            Self::BottomUp => "bottom-up",
            Self::ExpertJudgment => "expert-judgment",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MarketBased => "מחקר שוק",
            Self::Analogous => "השוואה אנלוגית",
            Self::Parametric => "מודל פרמטרי",
            Self::BottomUp => "הערכה מלמטה למעלה",
            Self::ExpertJudgment => "שיקול דעת מומחה",
        }
    }

    /// Fixed confidence score; also used as the method's accuracy
    pub fn score(&self) -> f64 {
        match self {
            Self::MarketBased => 95.0,
            Self::Analogous => 85.0,
            Self::Parametric => 80.0,
            Self::BottomUp => 90.0,
            Self::ExpertJudgment => 75.0,
        }
    }
}

impl fmt::Display for EstimationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EstimationMethod {
    type Err = EstimationError;

    /// Accepts canonical hyphenated names and legacy snake_case aliases
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "market-based" | "market" => Ok(Self::MarketBased),
            "analogous" => Ok(Self::Analogous),
            "parametric" => Ok(Self::Parametric),
            "bottom-up" => Ok(Self::BottomUp),
            "expert-judgment" | "expert" => Ok(Self::ExpertJudgment),
            _ => Err(EstimationError::UnknownMethod(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify by the average number of distinct risks per method
    pub fn from_average(average_risks: f64) -> Self {
        if average_risks > 3.0 {
            Self::High
        } else if average_risks > 1.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// One named component of a bottom-up breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLineItem {
    pub label: String,
    pub amount: f64,
}

impl CostLineItem {
    pub fn new(label: impl Into<String>, amount: f64) -> Self {
        Self {
            label: label.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub base_price: f64,
    pub tax: f64,
    pub shipping: f64,
    pub discounts: f64,
    pub risk_premium: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<CostLineItem>,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.base_price + self.tax + self.shipping + self.risk_premium - self.discounts
    }
}

/// Output of a single method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationResult {
    pub method: EstimationMethod,
    pub total_cost: f64,
    pub confidence: f64,
    pub accuracy: f64,
    pub breakdown: CostBreakdown,
    pub reasoning: Vec<String>,
    pub risks: Vec<String>,
    pub optimizations: Vec<String>,
    pub sources: Vec<String>,
}

impl EstimationResult {
    /// Weight used to pick the recommended estimate
    pub fn selection_score(&self) -> f64 {
        self.accuracy * self.confidence
    }
}

/// A requested method that produced no estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodFailure {
    /// Method name as requested by the caller
    pub method: String,
    pub reason: String,
}

impl MethodFailure {
    pub fn new(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            reason: reason.into(),
        }
    }
}

/// Per-method result collected by the aggregator
#[derive(Debug, Clone, PartialEq)]
pub enum MethodOutcome {
    Completed(EstimationResult),
    Failed(MethodFailure),
}

/// Category the engine settled on for a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMatch {
    pub category_id: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCategory {
    pub id: String,
    pub name: String,
    pub detection_confidence: f64,
}

/// Comparison of the recommended estimate with the EMF ceiling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCheck {
    pub max_funding: f64,
    pub recommended_cost: f64,
    pub within_budget: bool,
    /// Positive when the estimate exceeds the ceiling
    pub gap: f64,
}

impl BudgetCheck {
    pub fn new(max_funding: f64, recommended_cost: f64) -> Self {
        Self {
            max_funding,
            recommended_cost,
            within_budget: recommended_cost <= max_funding,
            gap: recommended_cost - max_funding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveEstimation {
    pub category: ResolvedCategory,
    pub estimates: Vec<EstimationResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<MethodFailure>,
    pub recommended: EstimationResult,
    pub overall_confidence: f64,
    pub total_savings_opportunity: f64,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetCheck>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_method_parsing_accepts_aliases() {
        assert_eq!("market-based".parse::<EstimationMethod>().unwrap(), EstimationMethod::MarketBased);
        assert_eq!("market_based".parse::<EstimationMethod>().unwrap(), EstimationMethod::MarketBased);
        assert_eq!("Bottom_Up".parse::<EstimationMethod>().unwrap(), EstimationMethod::BottomUp);
        assert_eq!("expert_judgment".parse::<EstimationMethod>().unwrap(), EstimationMethod::ExpertJudgment);
        assert!(matches!(
            "monte-carlo".parse::<EstimationMethod>(),
            Err(EstimationError::UnknownMethod(_))
        ));
    }

    #[test]
    fn test_method_scores() {
        let scores: Vec<f64> = EstimationMethod::ALL.iter().map(|m| m.score()).collect();
        assert_eq!(scores, vec![95.0, 85.0, 80.0, 90.0, 75.0]);
    }

    #[test]
    fn test_method_serializes_hyphenated() {
        let json = serde_json::to_string(&EstimationMethod::ExpertJudgment).unwrap();
        assert_eq!(json, "\"expert-judgment\"");
    }

    #[test]
    fn test_request_validation() {
        let request = EstimationRequest::new("מחשב נייד", "IT001", 5, date(2026, 12, 1));
        assert!(request.validate().is_ok());

        let zero = EstimationRequest { quantity: 0, ..request.clone() };
        assert!(matches!(zero.validate(), Err(EstimationError::InvalidRequest(_))));

        let unnamed = EstimationRequest { item_name: "  ".to_string(), ..request.clone() };
        assert!(unnamed.validate().is_err());

        let negative_budget = request.with_max_funding(-10.0);
        assert!(negative_budget.validate().is_err());
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: EstimationRequest = serde_json::from_value(serde_json::json!({
            "itemName": "שרת",
            "category": "IT002",
            "quantity": 2,
            "specifications": {"cpu": "32 cores"},
            "targetDate": "2026-11-30",
            "maxFunding": 150000.0
        }))
        .unwrap();

        assert_eq!(request.item_name, "שרת");
        assert_eq!(request.description, "");
        assert_eq!(request.max_funding, Some(150000.0));
        assert!(request.specification_text().contains("32 cores"));
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from_average(1.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_average(1.5), RiskLevel::Low);
        assert_eq!(RiskLevel::from_average(2.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_average(3.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_average(3.5), RiskLevel::High);
    }

    #[test]
    fn test_budget_check() {
        let over = BudgetCheck::new(10_000.0, 12_500.0);
        assert!(!over.within_budget);
        assert_eq!(over.gap, 2_500.0);

        let under = BudgetCheck::new(10_000.0, 9_000.0);
        assert!(under.within_budget);
        assert_eq!(under.gap, -1_000.0);
    }

    #[test]
    fn test_breakdown_total() {
        let breakdown = CostBreakdown {
            base_price: 1000.0,
            tax: 170.0,
            shipping: 200.0,
            discounts: 50.0,
            risk_premium: 20.0,
            line_items: vec![],
        };
        assert_eq!(breakdown.total(), 1340.0);
    }
}
