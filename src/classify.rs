// src/classify.rs
//! ESG classification capability.
//!
//! The pipeline is polymorphic over [`EsgClassifier`]; the deterministic
//! keyword matcher below is the default implementation, and a model-backed
//! one plugs in behind the same trait, selected by configuration. Per pillar,
//! a set of sub-factors (carbon emissions, labor practices, board
//! independence, ...) each carries a keyword list; a pillar's score is the
//! fraction of its sub-factors with at least one whole-word hit.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::config::ScoringConfig;
use crate::error::ScrapeError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    /// Set by the pipeline, not the classifier.
    #[serde(default)]
    pub company: String,
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
    pub confidence: f64,
    #[serde(default)]
    pub key_themes: Vec<String>,
    #[serde(default)]
    pub risk_indicators: Vec<String>,
}

impl ClassificationResult {
    pub fn zeroed() -> Self {
        Self {
            company: String::new(),
            environmental: 0.0,
            social: 0.0,
            governance: 0.0,
            confidence: 0.0,
            key_themes: Vec::new(),
            risk_indicators: Vec::new(),
        }
    }
}

#[async_trait]
pub trait EsgClassifier: std::fmt::Debug + Send + Sync {
    async fn classify(&self, text: &str) -> ClassificationResult;
    fn name(&self) -> &'static str;
}

/* ----------------------------
Keyword config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct SubFactorCfg {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordConfig {
    #[serde(default)]
    pub environmental: Vec<SubFactorCfg>,
    #[serde(default)]
    pub social: Vec<SubFactorCfg>,
    #[serde(default)]
    pub governance: Vec<SubFactorCfg>,
    #[serde(default)]
    pub risk_keywords: Vec<String>,
}

impl KeywordConfig {
    /// Load from a TOML file, falling back to the built-in seed on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    /// Built-in sub-factor seed. Used whenever no keyword config is found.
    pub fn default_seed() -> Self {
        fn sf(name: &str, keywords: &[&str]) -> SubFactorCfg {
            SubFactorCfg {
                name: name.to_string(),
                keywords: keywords.iter().map(|s| s.to_string()).collect(),
            }
        }
        Self {
            environmental: vec![
                sf("climate_change", &["climate change", "climate", "global warming"]),
                sf("carbon_emissions", &["carbon", "emissions", "greenhouse gas", "co2"]),
                sf("renewable_energy", &["renewable", "solar", "wind power", "clean energy"]),
                sf("pollution_waste", &["pollution", "waste management", "recycling", "waste"]),
                sf("water_biodiversity", &["water usage", "biodiversity", "deforestation"]),
                sf("sustainability", &["sustainability", "sustainable", "green technology"]),
            ],
            social: vec![
                sf("labor_practices", &["labor practices", "labor", "working conditions", "wages"]),
                sf("human_rights", &["human rights", "child labor", "forced labor"]),
                sf("diversity_inclusion", &["diversity", "inclusion", "equality", "gender pay"]),
                sf("community", &["community relations", "community", "philanthropy", "donation"]),
                sf("health_safety", &["workplace safety", "safety", "health", "wellbeing"]),
                sf("product_responsibility", &["product safety", "customer privacy", "data privacy", "recall"]),
            ],
            governance: vec![
                sf("board", &["board independence", "board", "directors", "leadership"]),
                sf("compensation", &["executive compensation", "remuneration", "bonus"]),
                sf("shareholder_rights", &["shareholder", "shareholders", "voting rights", "dividend"]),
                sf("ethics_compliance", &["compliance", "ethics", "anti-corruption", "bribery"]),
                sf("transparency", &["transparency", "audit", "disclosure", "accountability"]),
                sf("risk_management", &["risk management", "regulation", "regulatory", "oversight"]),
            ],
            risk_keywords: vec![
                "lawsuit",
                "fine",
                "penalty",
                "scandal",
                "violation",
                "breach",
                "corruption",
                "fraud",
                "recall",
                "investigation",
                "strike",
                "spill",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/* ----------------------------
Compiled keyword matcher
---------------------------- */

#[derive(Debug)]
struct CompiledSubFactor {
    name: String,
    patterns: Vec<Regex>,
}

#[derive(Debug)]
struct CompiledPillar {
    sub_factors: Vec<CompiledSubFactor>,
}

impl CompiledPillar {
    /// (score, matched sub-factor names)
    fn score(&self, text: &str) -> (f64, Vec<String>) {
        if self.sub_factors.is_empty() {
            return (0.0, Vec::new());
        }
        let mut matched = Vec::new();
        for sf in &self.sub_factors {
            if sf.patterns.iter().any(|re| re.is_match(text)) {
                matched.push(sf.name.clone());
            }
        }
        let score = (matched.len() as f64 / self.sub_factors.len() as f64).min(1.0);
        (score, matched)
    }
}

#[derive(Debug)]
pub struct KeywordClassifier {
    environmental: CompiledPillar,
    social: CompiledPillar,
    governance: CompiledPillar,
    risk_patterns: Vec<(String, Regex)>,
}

fn compile_keyword(kw: &str) -> Result<Regex, ScrapeError> {
    let escaped = regex::escape(kw.trim());
    Regex::new(&format!(r"(?i)\b{escaped}\b"))
        .map_err(|e| ScrapeError::config(format!("bad keyword `{kw}`: {e}")))
}

fn compile_pillar(cfgs: &[SubFactorCfg]) -> Result<CompiledPillar, ScrapeError> {
    let mut sub_factors = Vec::with_capacity(cfgs.len());
    for cfg in cfgs {
        if cfg.keywords.is_empty() {
            return Err(ScrapeError::config(format!(
                "sub-factor `{}` has no keywords",
                cfg.name
            )));
        }
        let patterns = cfg
            .keywords
            .iter()
            .map(|kw| compile_keyword(kw))
            .collect::<Result<Vec<_>, _>>()?;
        sub_factors.push(CompiledSubFactor {
            name: cfg.name.clone(),
            patterns,
        });
    }
    Ok(CompiledPillar { sub_factors })
}

impl KeywordClassifier {
    pub fn new(cfg: &KeywordConfig) -> Result<Self, ScrapeError> {
        let risk_patterns = cfg
            .risk_keywords
            .iter()
            .map(|kw| compile_keyword(kw).map(|re| (kw.clone(), re)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            environmental: compile_pillar(&cfg.environmental)?,
            social: compile_pillar(&cfg.social)?,
            governance: compile_pillar(&cfg.governance)?,
            risk_patterns,
        })
    }

    pub fn from_seed() -> Self {
        Self::new(&KeywordConfig::default_seed()).expect("built-in keyword seed compiles")
    }
}

#[async_trait]
impl EsgClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> ClassificationResult {
        let (env, mut themes) = self.environmental.score(text);
        let (soc, soc_themes) = self.social.score(text);
        let (gov, gov_themes) = self.governance.score(text);
        themes.extend(soc_themes);
        themes.extend(gov_themes);

        let risk_indicators = self
            .risk_patterns
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(kw, _)| kw.clone())
            .collect();

        ClassificationResult {
            company: String::new(),
            environmental: env,
            social: soc,
            governance: gov,
            // The keyword matcher is deterministic; its confidence is fixed.
            confidence: 1.0,
            key_themes: themes,
            risk_indicators,
        }
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Build the classifier named by configuration. Unknown names are a fatal
/// configuration error, not a silent fallback.
pub fn build_classifier(
    cfg: &ScoringConfig,
    keywords: &KeywordConfig,
) -> Result<Arc<dyn EsgClassifier>, ScrapeError> {
    match cfg.classifier.as_str() {
        "keyword" => Ok(Arc::new(KeywordClassifier::new(keywords)?)),
        other => Err(ScrapeError::config(format!(
            "unknown classifier `{other}` (expected \"keyword\")"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matches_are_whole_word_and_case_insensitive() {
        let c = KeywordClassifier::from_seed();
        // "carbonara" must not hit the carbon sub-factor.
        let r = c.classify("We ate carbonara at the board dinner.").await;
        assert_eq!(r.environmental, 0.0);
        assert!(r.governance > 0.0);
        assert!(r.key_themes.contains(&"board".to_string()));

        let upper = c.classify("CARBON EMISSIONS fell sharply.").await;
        assert!(upper.environmental > 0.0);
    }

    #[tokio::test]
    async fn pillar_score_is_fraction_of_subfactors() {
        let cfg = KeywordConfig {
            environmental: vec![
                SubFactorCfg {
                    name: "a".into(),
                    keywords: vec!["solar".into()],
                },
                SubFactorCfg {
                    name: "b".into(),
                    keywords: vec!["waste".into()],
                },
                SubFactorCfg {
                    name: "c".into(),
                    keywords: vec!["biodiversity".into()],
                },
                SubFactorCfg {
                    name: "d".into(),
                    keywords: vec!["deforestation".into()],
                },
            ],
            social: vec![],
            governance: vec![],
            risk_keywords: vec![],
        };
        let c = KeywordClassifier::new(&cfg).unwrap();
        let r = c.classify("Solar farms reduce waste.").await;
        assert!((r.environmental - 0.5).abs() < 1e-12);
        assert_eq!(r.confidence, 1.0);
    }

    #[tokio::test]
    async fn risk_indicators_are_collected() {
        let c = KeywordClassifier::from_seed();
        let r = c
            .classify("The company faces a lawsuit over an oil spill.")
            .await;
        assert!(r.risk_indicators.contains(&"lawsuit".to_string()));
        assert!(r.risk_indicators.contains(&"spill".to_string()));
    }

    #[tokio::test]
    async fn unrelated_text_scores_zero() {
        let c = KeywordClassifier::from_seed();
        let r = c.classify("Local weather forecast for Tuesday.").await;
        assert_eq!(r.environmental, 0.0);
        assert_eq!(r.social, 0.0);
        assert_eq!(r.governance, 0.0);
        assert!(r.key_themes.is_empty());
    }

    #[test]
    fn unknown_classifier_is_fatal() {
        let scoring = ScoringConfig {
            classifier: "bert".to_string(),
            ..Default::default()
        };
        let err = build_classifier(&scoring, &KeywordConfig::default_seed()).unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
    }
}
