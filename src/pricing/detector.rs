//! Keyword-based category detection
//!
//! Rules are evaluated top to bottom against the lower-cased concatenation of
//! item name, description and category label. The first rule with a matching
//! keyword wins; there is no scoring across rules.

use serde::{Deserialize, Serialize};

use super::models::CategoryMatch;

/// Category assigned when no rule matches
pub const FALLBACK_CATEGORY: &str = "PRD001";
pub const FALLBACK_CONFIDENCE: f64 = 60.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRule {
    pub keywords: Vec<String>,
    pub category_id: String,
    pub confidence: f64,
}

impl DetectionRule {
    pub fn new(keywords: &[&str], category_id: &str, confidence: f64) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            category_id: category_id.to_string(),
            confidence,
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct CategoryDetector {
    rules: Vec<DetectionRule>,
    fallback: CategoryMatch,
}

impl CategoryDetector {
    pub fn new(rules: Vec<DetectionRule>, fallback: CategoryMatch) -> Self {
        Self { rules, fallback }
    }

    pub fn detect(&self, item_name: &str, description: &str, category: &str) -> CategoryMatch {
        let haystack = format!("{} {} {}", item_name, description, category).to_lowercase();

        self.rules
            .iter()
            .find(|rule| rule.matches(&haystack))
            .map(|rule| CategoryMatch {
                category_id: rule.category_id.clone(),
                confidence: rule.confidence,
            })
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn rules(&self) -> &[DetectionRule] {
        &self.rules
    }
}

impl Default for CategoryDetector {
    fn default() -> Self {
        Self::new(
            vec![
                DetectionRule::new(&["מחשב", "laptop", "computer", "notebook"], "IT001", 95.0),
                DetectionRule::new(&["שרת", "server", "storage", "אחסון"], "IT002", 90.0),
                DetectionRule::new(
                    &["כסא", "שולחן", "ריהוט", "chair", "desk", "furniture"],
                    "FUR001",
                    90.0,
                ),
                DetectionRule::new(&["תוכנה", "רישיון", "software", "license"], "SW001", 85.0),
                DetectionRule::new(&["ייעוץ", "שירותי", "consulting", "service"], "SRV001", 80.0),
            ],
            CategoryMatch {
                category_id: FALLBACK_CATEGORY.to_string(),
                confidence: FALLBACK_CONFIDENCE,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hebrew_laptop() {
        let detector = CategoryDetector::default();
        let result = detector.detect("מחשב נייד", "", "");
        assert_eq!(result.category_id, "IT001");
        assert_eq!(result.confidence, 95.0);
    }

    #[test]
    fn test_english_keywords_case_insensitive() {
        let detector = CategoryDetector::default();
        assert_eq!(detector.detect("Dell LAPTOP", "", "").category_id, "IT001");
        assert_eq!(detector.detect("Rack Server", "", "").category_id, "IT002");
        assert_eq!(detector.detect("", "", "Office Furniture").category_id, "FUR001");
    }

    #[test]
    fn test_first_rule_wins() {
        let detector = CategoryDetector::default();
        // Mentions both a computer and a server; the computer rule is earlier
        let result = detector.detect("server computer", "", "");
        assert_eq!(result.category_id, "IT001");
    }

    #[test]
    fn test_matches_in_description() {
        let detector = CategoryDetector::default();
        let result = detector.detect("פריט 17", "כסא ארגונומי עם משענת", "");
        assert_eq!(result.category_id, "FUR001");
        assert_eq!(result.confidence, 90.0);
    }

    #[test]
    fn test_fallback() {
        let detector = CategoryDetector::default();
        let result = detector.detect("נייר צילום", "A4", "משרדי");
        assert_eq!(result.category_id, FALLBACK_CATEGORY);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_deterministic() {
        let detector = CategoryDetector::default();
        let a = detector.detect("software license", "", "");
        let b = detector.detect("software license", "", "");
        assert_eq!(a, b);
        assert_eq!(a.category_id, "SW001");
    }
}
