//! Project health score for a set of diagnostics.
//!
//! Starts at 100 and subtracts the category weight times the damping factor
//! for every diagnostic, clamped at 0.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::category::Category;
use crate::config::{CategoryWeights, HealthConfig};

pub const BASE_SCORE: f64 = 100.0;

/// Minimum score for each grade.
pub mod grades {
    pub const A_MIN: f64 = 90.0;
    pub const B_MIN: f64 = 80.0;
    pub const C_MIN: f64 = 70.0;
    pub const D_MIN: f64 = 60.0;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    /// 0-100, higher is healthier, one decimal
    pub score: f64,
    /// Letter grade: "A" (>=90), "B" (>=80), "C" (>=70), "D" (>=60), "F"
    pub grade: String,
    /// Points deducted per category
    pub deductions: BTreeMap<Category, f64>,
    /// Number of diagnostics scored
    pub diagnostics: usize,
}

impl HealthScore {
    pub fn total_deduction(&self) -> f64 {
        self.deductions.values().sum()
    }

    pub fn is_failing(&self) -> bool {
        self.grade == "F"
    }
}

fn weight(weights: &CategoryWeights, category: Category) -> f64 {
    match category {
        Category::BugRisk => weights.bug_risk,
        Category::Performance => weights.performance,
        Category::Readability => weights.readability,
        Category::Modernization => weights.modernization,
        Category::UnusedCode => weights.unused_code,
        Category::Other => weights.other,
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Determine the letter grade from a score.
pub fn calculate_grade(score: f64) -> String {
    match score {
        s if s >= grades::A_MIN => "A".to_string(),
        s if s >= grades::B_MIN => "B".to_string(),
        s if s >= grades::C_MIN => "C".to_string(),
        s if s >= grades::D_MIN => "D".to_string(),
        _ => "F".to_string(),
    }
}

/// Score the categories of a diagnostic list.
pub fn calculate<I>(categories: I, config: &HealthConfig) -> HealthScore
where
    I: IntoIterator<Item = Category>,
{
    let mut deductions: BTreeMap<Category, f64> = BTreeMap::new();
    let mut diagnostics = 0;

    for category in categories {
        diagnostics += 1;
        let points = weight(&config.weights, category) * config.damping;
        if points > 0.0 {
            *deductions.entry(category).or_insert(0.0) += points;
        }
    }

    let total: f64 = deductions.values().sum();
    let score = round_tenth((BASE_SCORE - total).max(0.0));
    for value in deductions.values_mut() {
        *value = round_tenth(*value);
    }

    HealthScore {
        score,
        grade: calculate_grade(score),
        deductions,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_perfect() {
        let health = calculate(Vec::new(), &HealthConfig::default());
        assert_eq!(health.score, 100.0);
        assert_eq!(health.grade, "A");
        assert!(health.deductions.is_empty());
    }

    #[test]
    fn test_default_weights() {
        let cats = vec![
            Category::BugRisk,
            Category::Performance,
            Category::Readability,
            Category::Modernization,
            Category::UnusedCode,
            Category::Other,
        ];
        let health = calculate(cats, &HealthConfig::default());
        // 0.5 + 0.3 + 0.2 + 0.1
        assert_eq!(health.score, 98.9);
        assert_eq!(health.diagnostics, 6);
        assert_eq!(health.deductions.get(&Category::BugRisk), Some(&0.5));
        assert!(health.deductions.get(&Category::Other).is_none());
    }

    #[test]
    fn test_clamped_at_zero() {
        let cats = std::iter::repeat(Category::BugRisk).take(500);
        let health = calculate(cats, &HealthConfig::default());
        assert_eq!(health.score, 0.0);
        assert_eq!(health.grade, "F");
        assert!(health.is_failing());
        assert_eq!(health.total_deduction(), 250.0);
    }

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(calculate_grade(100.0), "A");
        assert_eq!(calculate_grade(90.0), "A");
        assert_eq!(calculate_grade(89.9), "B");
        assert_eq!(calculate_grade(80.0), "B");
        assert_eq!(calculate_grade(79.9), "C");
        assert_eq!(calculate_grade(70.0), "C");
        assert_eq!(calculate_grade(60.0), "D");
        assert_eq!(calculate_grade(59.9), "F");
        assert_eq!(calculate_grade(0.0), "F");
    }

    #[test]
    fn test_custom_weights() {
        let mut config = HealthConfig::default();
        config.damping = 1.0;
        config.weights.other = 10.0;
        let health = calculate(vec![Category::Other; 3], &config);
        assert_eq!(health.score, 70.0);
        assert_eq!(health.grade, "C");
    }

    #[test]
    fn test_bug_risk_is_monotonic() {
        let config = HealthConfig::default();
        let mut previous = BASE_SCORE;
        for n in 0..300 {
            let mut cats = vec![Category::Readability; 20];
            cats.extend(std::iter::repeat(Category::BugRisk).take(n));
            let health = calculate(cats, &config);
            assert!(health.score <= previous);
            previous = health.score;
        }
    }
}
