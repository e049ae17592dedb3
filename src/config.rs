// src/config.rs
//! Process-wide settings, constructed once at startup and passed into each
//! component's constructor. No ambient global mutable state.
//!
//! Loaded from TOML (`config/settings.toml` by default, overridable via
//! `ESG_SETTINGS_PATH`); every field has a default so a missing file yields a
//! working configuration. Pillar weights are validated fatally: a registry or
//! settings problem must abort the process before any job runs.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ScrapeError;

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.toml";
pub const ENV_SETTINGS_PATH: &str = "ESG_SETTINGS_PATH";

/// Tolerance for the pillar-weight sum check.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Global ceiling on outstanding HTTP requests.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    /// Politeness delay applied before each request, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub request_delay_ms: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Per-company deadline; expired jobs stop fetching but still aggregate.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Undated articles pass the date filter (fail open). Deliberate policy:
    /// many sources expose no usable date at all.
    #[serde(default = "default_true")]
    pub include_undated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,
    /// Character budget for a single provider call.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Disable the remote provider entirely (articles pass through untranslated).
    #[serde(default)]
    pub offline: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_env_weight")]
    pub environmental_weight: f64,
    #[serde(default = "default_soc_weight")]
    pub social_weight: f64,
    #[serde(default = "default_gov_weight")]
    pub governance_weight: f64,
    /// "keyword" selects the deterministic keyword classifier; other values
    /// are reserved for model-backed implementations behind the same trait.
    #[serde(default = "default_classifier")]
    pub classifier: String,
    /// Anchor-text similarity cutoff for fuzzy company matching.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_match_threshold: f64,
}

fn default_max_concurrent() -> usize {
    10
}
fn default_delay_ms() -> u64 {
    1_000
}
fn default_request_timeout() -> u64 {
    10
}
fn default_job_timeout() -> u64 {
    120
}
fn default_user_agent() -> String {
    "esg-news-scorer/0.1 (+github.com/esg-tools/esg-news-scorer)".to_string()
}
fn default_true() -> bool {
    true
}
fn default_target_language() -> String {
    "en".to_string()
}
fn default_supported_languages() -> Vec<String> {
    ["en", "de", "fr", "es", "zh", "ja"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_max_chars() -> usize {
    5_000
}
fn default_env_weight() -> f64 {
    0.33
}
fn default_soc_weight() -> f64 {
    0.33
}
fn default_gov_weight() -> f64 {
    0.34
}
fn default_classifier() -> String {
    "keyword".to_string()
}
fn default_fuzzy_threshold() -> f64 {
    0.65
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            request_delay_ms: default_delay_ms(),
            request_timeout_secs: default_request_timeout(),
            job_timeout_secs: default_job_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include_undated: true,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target_language: default_target_language(),
            supported_languages: default_supported_languages(),
            max_chars: default_max_chars(),
            offline: false,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            environmental_weight: default_env_weight(),
            social_weight: default_soc_weight(),
            governance_weight: default_gov_weight(),
            classifier: default_classifier(),
            fuzzy_match_threshold: default_fuzzy_threshold(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            filter: FilterConfig::default(),
            translation: TranslationConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load settings using env var + fallback:
    /// 1) $ESG_SETTINGS_PATH
    /// 2) config/settings.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self, ScrapeError> {
        if let Ok(p) = std::env::var(ENV_SETTINGS_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(ScrapeError::config(format!(
                    "{ENV_SETTINGS_PATH} points to non-existent path {}",
                    pb.display()
                )));
            }
            return Self::load_from(&pb);
        }
        let default = Path::new(DEFAULT_SETTINGS_PATH);
        if default.exists() {
            return Self::load_from(default);
        }
        let cfg = Self::default();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self, ScrapeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::config(format!("reading settings from {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ScrapeError> {
        let cfg: AppConfig =
            toml::from_str(s).map_err(|e| ScrapeError::config(format!("settings parse: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Pillar weights must sum to 1.0 within tolerance and every knob must be
    /// usable; anything else aborts before the first job.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        let s = &self.scoring;
        for (name, w) in [
            ("environmental_weight", s.environmental_weight),
            ("social_weight", s.social_weight),
            ("governance_weight", s.governance_weight),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(ScrapeError::config(format!("{name} {w} outside [0, 1]")));
            }
        }
        let sum = s.environmental_weight + s.social_weight + s.governance_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ScrapeError::config(format!(
                "pillar weights sum to {sum}, expected 1.0"
            )));
        }
        if !(0.0..=1.0).contains(&s.fuzzy_match_threshold) {
            return Err(ScrapeError::config(format!(
                "fuzzy_match_threshold {} outside [0, 1]",
                s.fuzzy_match_threshold
            )));
        }
        if self.fetch.max_concurrent_requests == 0 {
            return Err(ScrapeError::config("max_concurrent_requests must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.translation.target_language, "en");
        assert_eq!(cfg.translation.max_chars, 5_000);
        assert!(cfg.filter.include_undated);
    }

    #[test]
    fn weight_sum_is_enforced() {
        let bad = r#"
[scoring]
environmental_weight = 0.5
social_weight = 0.5
governance_weight = 0.5
"#;
        let err = AppConfig::from_toml_str(bad).unwrap_err();
        assert!(err.to_string().contains("sum"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = AppConfig::from_toml_str("[fetch]\nmax_concurrent_requests = 3\n").unwrap();
        assert_eq!(cfg.fetch.max_concurrent_requests, 3);
        assert_eq!(cfg.fetch.request_delay_ms, 1_000);
        assert!((cfg.scoring.governance_weight - 0.34).abs() < 1e-12);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let err = AppConfig::from_toml_str("[fetch]\nmax_concurrent_requests = 0\n").unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
    }
}
