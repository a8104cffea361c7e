//! Static reference tables used by the estimation methods

use chrono::NaiveDate;
use indexmap::IndexMap;
use std::collections::HashMap;

use super::models::{
    HistoricalProcurement, ProcurementCategory, RegressionModel, SupplierPerformance,
};
use crate::error::{EstimationError, Result};

/// Benchmark unit price when a category has no expert benchmark
pub const DEFAULT_BENCHMARK_PRICE: f64 = 1000.0;

/// Model applied to categories without a dedicated regression
pub const GENERIC_REGRESSION: RegressionModel = RegressionModel {
    intercept: 1000.0,
    quantity_coefficient: -1.0,
    complexity_coefficient: 300.0,
    r_squared: 0.72,
};

/// Read-only lookup data injected into the engine
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    categories: IndexMap<String, ProcurementCategory>,
    historical: Vec<HistoricalProcurement>,
    suppliers: Vec<SupplierPerformance>,
    regression_models: HashMap<String, RegressionModel>,
    benchmarks: HashMap<String, f64>,
}

impl ReferenceData {
    pub fn new(
        categories: Vec<ProcurementCategory>,
        historical: Vec<HistoricalProcurement>,
        suppliers: Vec<SupplierPerformance>,
    ) -> Self {
        Self {
            categories: categories.into_iter().map(|c| (c.id.clone(), c)).collect(),
            historical,
            suppliers,
            regression_models: HashMap::new(),
            benchmarks: HashMap::new(),
        }
    }

    pub fn with_regression_model(mut self, category_id: impl Into<String>, model: RegressionModel) -> Self {
        self.regression_models.insert(category_id.into(), model);
        self
    }

    pub fn with_benchmark(mut self, category_id: impl Into<String>, price: f64) -> Self {
        self.benchmarks.insert(category_id.into(), price);
        self
    }

    pub fn category(&self, id: &str) -> Result<&ProcurementCategory> {
        self.categories
            .get(id)
            .ok_or_else(|| EstimationError::CategoryNotFound(id.to_string()))
    }

    /// Case-insensitive id lookup
    pub fn find_category_id(&self, label: &str) -> Option<&str> {
        let label = label.trim();
        self.categories
            .keys()
            .find(|id| id.eq_ignore_ascii_case(label))
            .map(String::as_str)
    }

    pub fn categories(&self) -> impl Iterator<Item = &ProcurementCategory> {
        self.categories.values()
    }

    /// Historical records for a category, in table order
    pub fn historical_for(&self, category_id: &str) -> Vec<&HistoricalProcurement> {
        self.historical
            .iter()
            .filter(|h| h.category == category_id)
            .collect()
    }

    pub fn suppliers(&self) -> &[SupplierPerformance] {
        &self.suppliers
    }

    /// Suppliers ordered best-first by composite score
    pub fn ranked_suppliers(&self) -> Vec<&SupplierPerformance> {
        let mut ranked: Vec<&SupplierPerformance> = self.suppliers.iter().collect();
        ranked.sort_by(|a, b| b.composite_score().total_cmp(&a.composite_score()));
        ranked
    }

    pub fn regression_model(&self, category_id: &str) -> RegressionModel {
        self.regression_models
            .get(category_id)
            .copied()
            .unwrap_or(GENERIC_REGRESSION)
    }

    pub fn benchmark_price(&self, category_id: &str) -> f64 {
        self.benchmarks
            .get(category_id)
            .copied()
            .unwrap_or(DEFAULT_BENCHMARK_PRICE)
    }

    /// Demo dataset shipped with the service
    pub fn seeded() -> Self {
        Self::new(seed_categories(), seed_historical(), seed_suppliers())
            .with_regression_model(
                "IT001",
                RegressionModel {
                    intercept: 3200.0,
                    quantity_coefficient: -2.5,
                    complexity_coefficient: 800.0,
                    r_squared: 0.87,
                },
            )
            .with_regression_model(
                "IT002",
                RegressionModel {
                    intercept: 18000.0,
                    quantity_coefficient: -40.0,
                    complexity_coefficient: 6000.0,
                    r_squared: 0.82,
                },
            )
            .with_regression_model(
                "FUR001",
                RegressionModel {
                    intercept: 850.0,
                    quantity_coefficient: -0.8,
                    complexity_coefficient: 250.0,
                    r_squared: 0.79,
                },
            )
            .with_benchmark("IT001", 4200.0)
            .with_benchmark("IT002", 25000.0)
            .with_benchmark("FUR001", 1200.0)
            .with_benchmark("SW001", 2500.0)
            .with_benchmark("SRV001", 6000.0)
    }
}

fn category(
    id: &str,
    name: &str,
    pricing_multiplier: f64,
    risk_factor: f64,
    market_volatility: f64,
    avg_delivery_days: u32,
    expected_fields: &[&str],
) -> ProcurementCategory {
    ProcurementCategory {
        id: id.to_string(),
        name: name.to_string(),
        pricing_multiplier,
        risk_factor,
        market_volatility,
        avg_delivery_days,
        expected_fields: expected_fields.iter().map(|f| f.to_string()).collect(),
    }
}

fn seed_categories() -> Vec<ProcurementCategory> {
    vec![
        category("IT001", "ציוד מחשוב", 1.2, 0.2, 0.3, 14, &["מעבד", "זיכרון", "אחסון", "מסך"]),
        category("IT002", "שרתים ותשתיות", 1.5, 0.3, 0.4, 30, &["מעבדים", "זיכרון", "אחסון", "רשת"]),
        category("FUR001", "ריהוט משרדי", 1.0, 0.1, 0.15, 21, &["חומר", "מידות", "צבע"]),
        category("SW001", "תוכנה ורישוי", 1.1, 0.25, 0.2, 7, &["גרסה", "מספר משתמשים", "תקופת רישוי"]),
        category("SRV001", "שירותים מקצועיים", 1.3, 0.35, 0.25, 45, &["היקף", "משך", "תוצרים"]),
        category("PRD001", "מוצרים כלליים", 1.0, 0.2, 0.2, 14, &["תיאור", "כמות"]),
    ]
}

#[allow(clippy::too_many_arguments)]
fn historical(
    id: &str,
    category: &str,
    item_name: &str,
    quantity: u32,
    actual_cost: f64,
    estimated_cost: f64,
    supplier_id: &str,
    completion_date: (i32, u32, u32),
    satisfaction_score: f64,
    lessons: &str,
) -> HistoricalProcurement {
    let (y, m, d) = completion_date;
    HistoricalProcurement {
        id: id.to_string(),
        category: category.to_string(),
        item_name: item_name.to_string(),
        quantity,
        actual_cost,
        estimated_cost,
        variance_percent: ((actual_cost - estimated_cost) / estimated_cost * 1000.0).round() / 10.0,
        supplier_id: supplier_id.to_string(),
        completion_date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN),
        satisfaction_score,
        lessons: lessons.to_string(),
    }
}

fn seed_historical() -> Vec<HistoricalProcurement> {
    vec![
        historical("H001", "IT001", "מחשבים ניידים Dell Latitude", 20, 96000.0, 90000.0, "SUP001", (2024, 3, 15), 4.5, "הזמנה מוקדמת חסכה עלויות משלוח"),
        historical("H002", "IT001", "מחשבים שולחניים HP", 50, 180000.0, 185000.0, "SUP002", (2024, 6, 20), 4.2, "הנחת כמות של 6% הושגה במו\"מ"),
        historical("H003", "IT001", "מחשבים ניידים Lenovo ThinkPad", 10, 52000.0, 48000.0, "SUP001", (2024, 9, 1), 4.0, "עיכוב באספקה בשל מחסור ברכיבים"),
        historical("H004", "IT002", "שרתי Dell PowerEdge", 4, 140000.0, 150000.0, "SUP003", (2024, 1, 10), 4.7, "תמיכת יצרן מורחבת כלולה במחיר"),
        historical("H005", "IT002", "מערך אחסון NetApp", 1, 95000.0, 85000.0, "SUP003", (2024, 11, 5), 3.8, "עלויות התקנה לא נכללו בהערכה"),
        historical("H006", "FUR001", "כסאות ארגונומיים", 40, 36000.0, 38000.0, "SUP004", (2024, 5, 12), 4.6, "ספק מקומי קיצר זמני אספקה"),
        historical("H007", "FUR001", "שולחנות עבודה מתכווננים", 15, 27000.0, 25000.0, "SUP004", (2024, 8, 30), 4.1, "נדרשה הרכבה בתשלום נוסף"),
        historical("H008", "SRV001", "ייעוץ אבטחת מידע", 1, 120000.0, 110000.0, "SUP002", (2024, 4, 2), 3.9, "הגדרת תוצרים מראש מונעת חריגות"),
    ]
}

#[allow(clippy::too_many_arguments)]
fn supplier(
    id: &str,
    name: &str,
    rating: f64,
    avg_delivery_days: u32,
    reliability_score: f64,
    cost_efficiency: f64,
    quality_score: f64,
    total_orders: u32,
    on_time_delivery: f64,
    defect_rate: f64,
) -> SupplierPerformance {
    SupplierPerformance {
        id: id.to_string(),
        name: name.to_string(),
        rating,
        avg_delivery_days,
        reliability_score,
        cost_efficiency,
        quality_score,
        total_orders,
        on_time_delivery,
        defect_rate,
    }
}

fn seed_suppliers() -> Vec<SupplierPerformance> {
    vec![
        supplier("SUP001", "טכנולוגיות מתקדמות בע\"מ", 4.6, 10, 94.0, 82.0, 4.5, 156, 96.0, 0.8),
        supplier("SUP002", "מחשבי השרון", 4.2, 14, 88.0, 90.0, 4.1, 98, 91.0, 1.5),
        supplier("SUP003", "אינפרא סולושנס", 4.8, 21, 97.0, 75.0, 4.8, 64, 98.0, 0.4),
        supplier("SUP004", "רהיטי המרכז", 4.0, 18, 85.0, 88.0, 3.9, 210, 87.0, 2.1),
    ]
}
