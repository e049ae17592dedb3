// src/aggregate.rs
//! # Score Aggregation
//! Pure, testable logic that folds per-article classification results into a
//! per-company aggregate. No I/O.
//!
//! Per pillar: confidence-weighted mean over results with confidence > 0
//! (zero-confidence results contribute to neither numerator nor denominator).
//! Overall = weighted sum of pillar scores with configured weights summing to
//! 1.0. Aggregate confidence is the plain mean over *all* results: it
//! measures coverage quality, not just contribution. The fold is associative
//! and commutative, so output is independent of fetch/processing order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::ClassificationResult;
use crate::company::Company;
use crate::config::ScoringConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Band edges: a high ESG score means low risk. Zero-evidence aggregates
    /// land in High because overall is 0.
    pub fn from_overall(overall: f64) -> Self {
        if overall >= 0.66 {
            RiskLevel::Low
        } else if overall >= 0.33 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PillarWeights {
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
}

impl From<&ScoringConfig> for PillarWeights {
    fn from(cfg: &ScoringConfig) -> Self {
        Self {
            environmental: cfg.environmental_weight,
            social: cfg.social_weight,
            governance: cfg.governance_weight,
        }
    }
}

impl Default for PillarWeights {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateScore {
    pub company: String,
    pub date: DateTime<Utc>,
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
    pub overall: f64,
    pub confidence: f64,
    pub articles_analyzed: usize,
    pub risk_level: RiskLevel,
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Confidence-weighted mean of one pillar, over contributions with
/// confidence > 0. Empty or all-zero-confidence input yields 0.
fn weighted_pillar(values: impl Iterator<Item = (f64, f64)>) -> f64 {
    let mut num = 0.0;
    let mut denom = 0.0;
    for (score, conf) in values {
        if conf > 0.0 {
            num += clamp01(score) * conf;
            denom += conf;
        }
    }
    if denom > 0.0 {
        clamp01(num / denom)
    } else {
        0.0
    }
}

pub fn aggregate(
    company: &Company,
    results: &[ClassificationResult],
    weights: &PillarWeights,
    now: DateTime<Utc>,
) -> AggregateScore {
    let environmental = weighted_pillar(results.iter().map(|r| (r.environmental, r.confidence)));
    let social = weighted_pillar(results.iter().map(|r| (r.social, r.confidence)));
    let governance = weighted_pillar(results.iter().map(|r| (r.governance, r.confidence)));

    let overall = clamp01(
        environmental * weights.environmental
            + social * weights.social
            + governance * weights.governance,
    );

    // Mean over all results, zero-confidence ones included.
    let confidence = if results.is_empty() {
        0.0
    } else {
        clamp01(results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64)
    };

    AggregateScore {
        company: company.name.clone(),
        date: now,
        environmental,
        social,
        governance,
        overall,
        confidence,
        articles_analyzed: results.len(),
        risk_level: RiskLevel::from_overall(overall),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn res(env: f64, soc: f64, gov: f64, conf: f64) -> ClassificationResult {
        ClassificationResult {
            company: String::new(),
            environmental: env,
            social: soc,
            governance: gov,
            confidence: conf,
            key_themes: Vec::new(),
            risk_indicators: Vec::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
    }

    fn company() -> Company {
        Company::with_ticker("Apple Inc.", "AAPL")
    }

    #[test]
    fn empty_input_yields_zeroed_score() {
        let agg = aggregate(&Company::new("Acme Corp"), &[], &PillarWeights::default(), now());
        assert_eq!(agg.environmental, 0.0);
        assert_eq!(agg.social, 0.0);
        assert_eq!(agg.governance, 0.0);
        assert_eq!(agg.overall, 0.0);
        assert_eq!(agg.confidence, 0.0);
        assert_eq!(agg.articles_analyzed, 0);
    }

    #[test]
    fn single_result_reproduces_itself() {
        let r = res(0.8, 0.4, 0.2, 0.9);
        let agg = aggregate(&company(), &[r.clone()], &PillarWeights::default(), now());
        assert!((agg.environmental - 0.8).abs() < 1e-12);
        assert!((agg.social - 0.4).abs() < 1e-12);
        assert!((agg.governance - 0.2).abs() < 1e-12);
        assert!((agg.confidence - 0.9).abs() < 1e-12);
        assert_eq!(agg.articles_analyzed, 1);
    }

    #[test]
    fn replication_leaves_scores_unchanged() {
        let r = res(0.6, 0.3, 0.9, 0.7);
        let one = aggregate(&company(), &[r.clone()], &PillarWeights::default(), now());
        let five = aggregate(
            &company(),
            &vec![r; 5],
            &PillarWeights::default(),
            now(),
        );
        assert!((one.environmental - five.environmental).abs() < 1e-12);
        assert!((one.social - five.social).abs() < 1e-12);
        assert!((one.governance - five.governance).abs() < 1e-12);
        assert!((one.confidence - five.confidence).abs() < 1e-12);
    }

    #[test]
    fn zero_confidence_results_do_not_corrupt_the_average() {
        // environmental = [0.8, 0.6, 0.0], confidence = [1.0, 1.0, 0.0]
        // → (0.8 + 0.6) / 2.0 = 0.70, articles_analyzed = 3
        let results = vec![
            res(0.8, 0.0, 0.0, 1.0),
            res(0.6, 0.0, 0.0, 1.0),
            res(0.0, 0.0, 0.0, 0.0),
        ];
        let agg = aggregate(&company(), &results, &PillarWeights::default(), now());
        assert!((agg.environmental - 0.70).abs() < 1e-12);
        assert_eq!(agg.articles_analyzed, 3);
        // coverage confidence counts the dead article: (1 + 1 + 0) / 3
        assert!((agg.confidence - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn overall_is_the_weighted_pillar_sum() {
        let w = PillarWeights {
            environmental: 0.33,
            social: 0.33,
            governance: 0.34,
        };
        assert!((w.environmental + w.social + w.governance - 1.0).abs() < 1e-9);
        let results = vec![res(1.0, 0.5, 0.0, 1.0)];
        let agg = aggregate(&company(), &results, &w, now());
        let expected = 1.0 * 0.33 + 0.5 * 0.33 + 0.0 * 0.34;
        assert!((agg.overall - expected).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&agg.overall));
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let results = vec![res(1.5, -0.2, 0.5, 1.0)];
        let agg = aggregate(&company(), &results, &PillarWeights::default(), now());
        assert!((agg.environmental - 1.0).abs() < 1e-12);
        assert_eq!(agg.social, 0.0);
    }

    #[test]
    fn risk_bands() {
        assert_eq!(RiskLevel::from_overall(0.8), RiskLevel::Low);
        assert_eq!(RiskLevel::from_overall(0.66), RiskLevel::Low);
        assert_eq!(RiskLevel::from_overall(0.5), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_overall(0.33), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_overall(0.1), RiskLevel::High);
    }
}
