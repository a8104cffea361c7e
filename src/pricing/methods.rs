//! The five estimation methods
//!
//! Every method is a deterministic function of the request, the category
//! metadata, the reference tables and the calculation date. Money figures are
//! rounded to whole shekels before they are combined, and tax is always 17% of
//! the rounded base price.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;
use tracing::debug;

use super::models::{
    CostBreakdown, CostLineItem, EstimationMethod, EstimationRequest, EstimationResult,
    ProcurementCategory,
};
use super::reference::ReferenceData;
use crate::error::{EstimationError, Result};

pub const VAT_RATE: f64 = 0.17;
pub const SHIPPING_PER_UNIT: f64 = 50.0;
pub const MIN_SHIPPING: f64 = 200.0;

/// System-wide unit price for the market-based method
pub const DEFAULT_UNIT_PRICE: f64 = 1000.0;
/// Per-unit placeholder for the bottom-up template
pub const BOTTOM_UP_UNIT_COST: f64 = 1000.0;
pub const MONTHLY_INFLATION: f64 = 0.003;
pub const MAX_ANALOGUES: usize = 5;

const COMPLEX_KEYWORDS: [&str; 4] = ["מורכב", "מתקדם", "complex", "advanced"];
const SIMPLE_KEYWORDS: [&str; 4] = ["פשוט", "בסיסי", "simple", "basic"];

/// Inputs shared by all methods for a single calculation
#[derive(Debug, Clone, Copy)]
pub struct EstimationContext<'a> {
    pub request: &'a EstimationRequest,
    pub category: &'a ProcurementCategory,
    pub reference: &'a ReferenceData,
    pub as_of: NaiveDate,
}

impl EstimationContext<'_> {
    fn quantity(&self) -> f64 {
        self.request.quantity as f64
    }
}

/// A single estimation method
pub trait Estimator: Send + Sync {
    fn method(&self) -> EstimationMethod;

    fn estimate(&self, ctx: &EstimationContext<'_>) -> Result<EstimationResult>;
}

/// Dispatch table from method to implementation
pub fn estimator_for(method: EstimationMethod) -> &'static dyn Estimator {
    match method {
        EstimationMethod::MarketBased => &MarketBased,
        EstimationMethod::Analogous => &Analogous,
        EstimationMethod::Parametric => &Parametric,
        EstimationMethod::BottomUp => &BottomUp,
        EstimationMethod::ExpertJudgment => &ExpertJudgment,
    }
}

pub fn shipping_cost(quantity: u32) -> f64 {
    (quantity as f64 * SHIPPING_PER_UNIT).max(MIN_SHIPPING)
}

pub fn vat(base_price: f64) -> f64 {
    (base_price * VAT_RATE).round()
}

/// Market-based quantity discount band
pub fn quantity_discount_rate(quantity: u32) -> f64 {
    match quantity {
        q if q >= 50 => 0.08,
        q if q >= 20 => 0.05,
        q if q >= 10 => 0.02,
        _ => 0.0,
    }
}

/// Economies-of-scale multiplier used by expert judgment
pub fn scale_multiplier(quantity: u32) -> f64 {
    match quantity {
        q if q >= 100 => 0.85,
        q if q >= 50 => 0.9,
        q if q >= 20 => 0.95,
        _ => 1.0,
    }
}

/// Urgency multiplier from the days remaining until the target date
pub fn urgency_multiplier(days_until_target: i64) -> f64 {
    if days_until_target < 7 {
        1.2
    } else if days_until_target < 30 {
        1.1
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Complex,
    Standard,
    Simple,
}

impl Complexity {
    /// Complexity keywords take precedence over simplicity keywords
    pub fn assess(text: &str) -> Self {
        let text = text.to_lowercase();
        if COMPLEX_KEYWORDS.iter().any(|k| text.contains(k)) {
            Self::Complex
        } else if SIMPLE_KEYWORDS.iter().any(|k| text.contains(k)) {
            Self::Simple
        } else {
            Self::Standard
        }
    }

    /// Parameter value for the parametric model
    pub fn parameter(&self) -> f64 {
        match self {
            Self::Complex => 1.0,
            Self::Standard => 0.5,
            Self::Simple => 0.0,
        }
    }

    /// Expert-judgment multiplier
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Complex => 1.3,
            Self::Standard => 1.0,
            Self::Simple => 0.8,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Complex => "מורכב",
            Self::Standard => "סטנדרטי",
            Self::Simple => "פשוט",
        }
    }
}

/// Whole calendar months from `from` to `to`, never negative
pub fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Format an amount as whole shekels with thousands separators
pub fn format_ils(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-₪{}", grouped)
    } else {
        format!("₪{}", grouped)
    }
}

fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

fn finish(
    method: EstimationMethod,
    breakdown: CostBreakdown,
    reasoning: Vec<String>,
    risks: Vec<String>,
    optimizations: Vec<String>,
    sources: Vec<String>,
) -> EstimationResult {
    let total_cost = breakdown.total();
    debug!(method = %method, total_cost, "Estimation method completed");

    EstimationResult {
        method,
        total_cost,
        confidence: method.score(),
        accuracy: method.score(),
        breakdown,
        reasoning,
        risks,
        optimizations,
        sources,
    }
}

/// Fixed unit price scaled by category multiplier and volatility
pub struct MarketBased;

impl Estimator for MarketBased {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::MarketBased
    }

    fn estimate(&self, ctx: &EstimationContext<'_>) -> Result<EstimationResult> {
        let category = ctx.category;
        let quantity = ctx.quantity();

        let unit_price = DEFAULT_UNIT_PRICE * category.pricing_multiplier;
        let volatility_adjustment = 1.0 + category.market_volatility * 0.5;
        let base_price = (unit_price * quantity * volatility_adjustment).round();
        let tax = vat(base_price);
        let shipping = shipping_cost(ctx.request.quantity);
        let discount_rate = quantity_discount_rate(ctx.request.quantity);
        let discounts = (base_price * discount_rate).round();
        let risk_premium = (base_price * category.risk_factor * 0.1).round();

        let breakdown = CostBreakdown {
            base_price,
            tax,
            shipping,
            discounts,
            risk_premium,
            line_items: Vec::new(),
        };

        let reasoning = vec![
            format!(
                "מחיר יחידה בסיסי {} מוכפל במקדם התמחור של הקטגוריה {} ({})",
                format_ils(DEFAULT_UNIT_PRICE),
                category.name,
                category.pricing_multiplier
            ),
            format!(
                "התאמת תנודתיות שוק של {} הובילה למחיר מותאם של {} עבור {} יחידות",
                percent(category.market_volatility * 0.5),
                format_ils(base_price),
                ctx.request.quantity
            ),
            format!("מע\"מ 17%: {}, משלוח: {}", format_ils(tax), format_ils(shipping)),
            if discount_rate > 0.0 {
                format!("הנחת כמות של {}: {}", percent(discount_rate), format_ils(discounts))
            } else {
                "לא חלה הנחת כמות בהיקף ההזמנה הנוכחי".to_string()
            },
        ];

        let mut risks = vec!["שינויים בשערי מטבע עשויים להשפיע על מחירי יבוא".to_string()];
        if category.market_volatility > 0.25 {
            risks.push(format!(
                "תנודתיות שוק גבוהה ({}) עלולה לשנות מחירים עד מועד הרכישה",
                percent(category.market_volatility)
            ));
        }
        if category.risk_factor >= 0.25 {
            risks.push(format!(
                "פקטור סיכון קטגוריה גבוה ({})",
                percent(category.risk_factor)
            ));
        }
        if category.avg_delivery_days > 21 {
            risks.push(format!(
                "זמן אספקה ממוצע ארוך ({} ימים)",
                category.avg_delivery_days
            ));
        }
        if ctx.request.quantity >= 100 {
            risks.push("היקף הזמנה גדול עלול להאריך את זמני האספקה".to_string());
        }

        let mut optimizations = Vec::new();
        if let Some((next_quantity, next_rate)) = next_discount_band(ctx.request.quantity) {
            optimizations.push(format!(
                "הגדלת ההזמנה ל-{} יחידות תזכה בהנחת כמות של {}",
                next_quantity,
                percent(next_rate)
            ));
        }
        let top_supplier = ctx.reference.ranked_suppliers().into_iter().next();
        if let Some(supplier) = top_supplier {
            optimizations.push(format!(
                "פנייה לספק {} (דירוג {:.1}, אספקה בזמן {:.0}%)",
                supplier.name, supplier.rating, supplier.on_time_delivery
            ));
        }
        optimizations.push("השוואת הצעות מחיר משלושה ספקים לפחות".to_string());

        let mut sources = vec![
            "מחירון בסיס מערכתי".to_string(),
            format!("מדדי תנודתיות לקטגוריה {}", category.name),
        ];
        if let Some(supplier) = top_supplier {
            sources.push(format!("נתוני ביצועי ספקים: {}", supplier.name));
        }

        Ok(finish(
            self.method(),
            breakdown,
            reasoning,
            risks,
            optimizations,
            sources,
        ))
    }
}

fn next_discount_band(quantity: u32) -> Option<(u32, f64)> {
    [10u32, 20, 50]
        .into_iter()
        .find(|&threshold| quantity < threshold)
        .map(|threshold| (threshold, quantity_discount_rate(threshold)))
}

/// Similarity-weighted average of inflation-adjusted past procurements
pub struct Analogous;

impl Estimator for Analogous {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::Analogous
    }

    fn estimate(&self, ctx: &EstimationContext<'_>) -> Result<EstimationResult> {
        let category = ctx.category;
        let records: Vec<_> = ctx
            .reference
            .historical_for(&category.id)
            .into_iter()
            .take(MAX_ANALOGUES)
            .collect();

        if records.is_empty() {
            return Err(EstimationError::NoHistoricalData(category.id.clone()));
        }

        let quantity = ctx.quantity();
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut oldest_months = 0;
        let mut sources = Vec::with_capacity(records.len());

        for record in &records {
            let historical_quantity = record.quantity.max(1) as f64;
            let similarity =
                0.2 + 0.8 * quantity.min(historical_quantity) / quantity.max(historical_quantity);
            let months = months_between(record.completion_date, ctx.as_of);
            let inflated = record.actual_cost * (1.0 + MONTHLY_INFLATION).powi(months as i32);
            let scaled = inflated * quantity / historical_quantity;

            weighted_sum += scaled * similarity;
            weight_total += similarity;
            oldest_months = oldest_months.max(months);

            sources.push(format!(
                "רכישה {}: {} ({} יח', {})",
                record.id,
                record.item_name,
                record.quantity,
                record.completion_date.format("%Y-%m-%d")
            ));
        }

        let weighted_estimate = weighted_sum / weight_total;
        let average_satisfaction =
            records.iter().map(|r| r.satisfaction_score).sum::<f64>() / records.len() as f64;
        let confidence_adjustment = 0.9 + (average_satisfaction - 4.0) * 0.05;

        let base_price = (weighted_estimate * confidence_adjustment).round();
        let tax = vat(base_price);
        let shipping = shipping_cost(ctx.request.quantity);

        let breakdown = CostBreakdown {
            base_price,
            tax,
            shipping,
            discounts: 0.0,
            risk_premium: 0.0,
            line_items: Vec::new(),
        };

        let reasoning = vec![
            format!(
                "נמצאו {} רכישות קודמות בקטגוריה {}",
                records.len(),
                category.name
            ),
            format!(
                "ממוצע משוקלל לפי דמיון בכמות, מותאם לאינפלציה של {:.1}% לחודש: {}",
                MONTHLY_INFLATION * 100.0,
                format_ils(weighted_estimate)
            ),
            format!(
                "שביעות רצון ממוצעת {:.2} הניבה מקדם התאמה של {:.3}",
                average_satisfaction, confidence_adjustment
            ),
        ];

        let mut risks =
            vec!["נתונים היסטוריים עשויים שלא לשקף את תנאי השוק הנוכחיים".to_string()];
        if records.len() < 3 {
            risks.push(format!("מדגם היסטורי מצומצם ({} רכישות)", records.len()));
        }
        if records.iter().any(|r| r.variance_percent.abs() > 10.0) {
            risks.push("ברכישות קודמות נרשמו סטיות של מעל 10% בין הערכה לביצוע".to_string());
        }
        if oldest_months > 24 {
            risks.push(format!("חלק מהנתונים ישנים ({} חודשים)", oldest_months));
        }

        let mut seen = BTreeSet::new();
        let mut optimizations = Vec::new();
        for record in &records {
            if !record.lessons.is_empty() && seen.insert(record.lessons.clone()) {
                optimizations.push(format!("לקח מרכישה {}: {}", record.id, record.lessons));
            }
        }

        Ok(finish(
            self.method(),
            breakdown,
            reasoning,
            risks,
            optimizations,
            sources,
        ))
    }
}

/// Fixed linear cost model per category
pub struct Parametric;

impl Estimator for Parametric {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::Parametric
    }

    fn estimate(&self, ctx: &EstimationContext<'_>) -> Result<EstimationResult> {
        let category = ctx.category;
        let model = ctx.reference.regression_model(&category.id);
        let quantity = ctx.quantity();
        let complexity = Complexity::assess(&ctx.request.specification_text());

        let raw_unit_cost = model.intercept
            + model.quantity_coefficient * quantity
            + model.complexity_coefficient * complexity.parameter();
        let unit_floor = model.intercept * 0.25;
        let unit_cost = raw_unit_cost.max(unit_floor);

        let base_price = (unit_cost * quantity * category.pricing_multiplier).round();
        let tax = vat(base_price);
        let shipping = shipping_cost(ctx.request.quantity);

        let breakdown = CostBreakdown {
            base_price,
            tax,
            shipping,
            discounts: 0.0,
            risk_premium: 0.0,
            line_items: Vec::new(),
        };

        let reasoning = vec![
            format!(
                "עלות ליחידה = {} + ({} × {}) + ({} × {}) = {}",
                model.intercept,
                model.quantity_coefficient,
                ctx.request.quantity,
                model.complexity_coefficient,
                complexity.parameter(),
                format_ils(unit_cost)
            ),
            format!(
                "מוכפל בכמות ובמקדם התמחור {} של הקטגוריה: {}",
                category.pricing_multiplier,
                format_ils(base_price)
            ),
            format!(
                "מודל ליניארי קבוע עם R² נומינלי של {:.2}; המקדמים אינם מותאמים לנתונים בזמן ריצה",
                model.r_squared
            ),
        ];

        let mut risks =
            vec!["המודל מבוסס על מקדמים קבועים ולא על נתוני שוק עדכניים".to_string()];
        if model.r_squared < 0.8 {
            risks.push(format!("מהימנות מודל נמוכה (R² = {:.2})", model.r_squared));
        }
        if complexity == Complexity::Standard {
            risks.push("רמת המורכבות לא צוינה במפרט; הונחה מורכבות בינונית".to_string());
        }
        if raw_unit_cost < unit_floor {
            risks.push("הכמות המבוקשת חורגת מטווח התוקף של המודל".to_string());
        }

        let mut optimizations = Vec::new();
        let missing = missing_fields(ctx.request, category);
        if !missing.is_empty() {
            optimizations.push(format!("השלמת שדות מפרט חסרים: {}", missing.join(", ")));
        }
        if complexity == Complexity::Complex {
            optimizations.push("בחינת חלופה סטנדרטית עשויה להוזיל את עלות היחידה".to_string());
        }

        let sources = vec![format!(
            "מודל רגרסיה לקטגוריה {} (R² {:.2})",
            category.name, model.r_squared
        )];

        Ok(finish(
            self.method(),
            breakdown,
            reasoning,
            risks,
            optimizations,
            sources,
        ))
    }
}

/// Expected category fields absent from the request's specifications
fn missing_fields(request: &EstimationRequest, category: &ProcurementCategory) -> Vec<String> {
    let provided = match &request.specifications {
        serde_json::Value::Object(map) => map.keys().cloned().collect::<BTreeSet<_>>(),
        _ => BTreeSet::new(),
    };

    category
        .expected_fields
        .iter()
        .filter(|f| !provided.contains(*f))
        .cloned()
        .collect()
}

/// Template breakdown into materials, labor and other components
pub struct BottomUp;

impl BottomUp {
    const MATERIALS_SHARE: f64 = 0.60;
    const LABOR_SHARE: f64 = 0.25;
    const OTHER_SHARE: f64 = 0.15;
    const INTEGRATION_OVERHEAD: f64 = 0.15;
    const QA_OVERHEAD: f64 = 0.05;
    const CONTINGENCY: f64 = 0.10;
}

impl Estimator for BottomUp {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::BottomUp
    }

    fn estimate(&self, ctx: &EstimationContext<'_>) -> Result<EstimationResult> {
        let category = ctx.category;
        let quantity = ctx.quantity();

        let materials = (BOTTOM_UP_UNIT_COST * Self::MATERIALS_SHARE * quantity).round();
        let labor = (BOTTOM_UP_UNIT_COST * Self::LABOR_SHARE * quantity).round();
        let other = (BOTTOM_UP_UNIT_COST * Self::OTHER_SHARE * quantity).round();
        let components = materials + labor + other;
        let integration = (components * Self::INTEGRATION_OVERHEAD).round();
        let quality_assurance = (components * Self::QA_OVERHEAD).round();

        let base_price = components + integration + quality_assurance;
        let tax = vat(base_price);
        let shipping = shipping_cost(ctx.request.quantity);
        let contingency = (base_price * Self::CONTINGENCY).round();

        let breakdown = CostBreakdown {
            base_price,
            tax,
            shipping,
            discounts: 0.0,
            risk_premium: contingency,
            line_items: vec![
                CostLineItem::new("חומרים (60%)", materials),
                CostLineItem::new("עבודה (25%)", labor),
                CostLineItem::new("רכיבים נוספים (15%)", other),
                CostLineItem::new("אינטגרציה (15%)", integration),
                CostLineItem::new("בקרת איכות (5%)", quality_assurance),
            ],
        };

        let reasoning = vec![
            format!(
                "פירוק תבניתי: חומרים {}, עבודה {}, רכיבים נוספים {}",
                format_ils(materials),
                format_ils(labor),
                format_ils(other)
            ),
            format!(
                "תוספות אינטגרציה {} ובקרת איכות {} על סך הרכיבים",
                format_ils(integration),
                format_ils(quality_assurance)
            ),
            format!("רזרבה לבלתי צפוי 10%: {}", format_ils(contingency)),
        ];

        let mut risks = vec![
            "הפירוק מבוסס על תבנית אחוזים קבועה ולא על כתב כמויות מפורט".to_string(),
        ];
        if category.risk_factor > 0.3 {
            risks.push(format!(
                "עלויות אינטגרציה עלולות לחרוג בקטגוריה {}",
                category.name
            ));
        }
        if ctx.request.quantity >= 50 {
            risks.push("עלויות העבודה עשויות לגדול בהיקפים גדולים".to_string());
        }

        let optimizations = vec![
            "קבלת הצעות נפרדות לחומרים ולעבודה".to_string(),
            "הפחתת הרזרבה לאחר קבלת הצעות מחייבות".to_string(),
        ];

        let sources = vec![
            "תבנית פירוק עלויות ארגונית".to_string(),
            format!("נתוני קטגוריה: {}", category.name),
        ];

        Ok(finish(
            self.method(),
            breakdown,
            reasoning,
            risks,
            optimizations,
            sources,
        ))
    }
}

/// Benchmark price adjusted by heuristic complexity, market and urgency factors
pub struct ExpertJudgment;

impl ExpertJudgment {
    const RISK_PREMIUM: f64 = 0.08;
}

impl Estimator for ExpertJudgment {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::ExpertJudgment
    }

    fn estimate(&self, ctx: &EstimationContext<'_>) -> Result<EstimationResult> {
        let category = ctx.category;
        let quantity = ctx.quantity();

        let complexity = Complexity::assess(&ctx.request.description);
        let complexity_factor = complexity.multiplier();
        let market_factor = 1.0 + category.market_volatility * 0.2;
        let days_until_target = (ctx.request.target_date - ctx.as_of).num_days();
        let urgency_factor = urgency_multiplier(days_until_target);
        let scale_factor = scale_multiplier(ctx.request.quantity);
        let benchmark = ctx.reference.benchmark_price(&category.id);

        let base_price = (benchmark
            * complexity_factor
            * market_factor
            * urgency_factor
            * quantity
            * scale_factor)
            .round();
        let tax = vat(base_price);
        let shipping = shipping_cost(ctx.request.quantity);
        let risk_premium = (base_price * Self::RISK_PREMIUM).round();

        let breakdown = CostBreakdown {
            base_price,
            tax,
            shipping,
            discounts: 0.0,
            risk_premium,
            line_items: Vec::new(),
        };

        let reasoning = vec![
            format!(
                "מחיר ייחוס לקטגוריה {}: {} ליחידה",
                category.name,
                format_ils(benchmark)
            ),
            format!(
                "מקדמים: מורכבות {} ({}), תנאי שוק {:.2}, דחיפות {:.1}, יתרון לגודל {:.2}",
                complexity.label(),
                complexity_factor,
                market_factor,
                urgency_factor,
                scale_factor
            ),
            format!("פרמיית סיכון מומחה 8%: {}", format_ils(risk_premium)),
        ];

        let mut risks = vec!["הערכת מומחה כפופה להטיות אישיות".to_string()];
        if urgency_factor > 1.0 {
            risks.push(format!(
                "לוח זמנים דחוק ({} ימים עד מועד היעד) מייקר את הרכש",
                days_until_target.max(0)
            ));
        }
        if complexity == Complexity::Complex {
            risks.push("מורכבות טכנית גבוהה עלולה לגרור דרישות נוספות".to_string());
        }
        if category.market_volatility > 0.3 {
            risks.push("תנאי שוק תנודתיים בקטגוריה".to_string());
        }

        let mut optimizations = Vec::new();
        if urgency_factor > 1.0 {
            optimizations.push("דחיית מועד היעד ל-30 יום לפחות תבטל את תוספת הדחיפות".to_string());
        }
        if scale_factor > 0.85 {
            optimizations.push("איחוד הזמנות בין יחידות ארגוניות לניצול יתרון לגודל".to_string());
        }
        optimizations.push("התייעצות עם מומחה תוכן נוסף לאימות ההערכה".to_string());

        let sources = vec![
            "מחירי ייחוס של צוות הרכש".to_string(),
            format!("מדד תנודתיות לקטגוריה {}", category.name),
        ];

        Ok(finish(
            self.method(),
            breakdown,
            reasoning,
            risks,
            optimizations,
            sources,
        ))
    }
}
