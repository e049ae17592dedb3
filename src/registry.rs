// src/registry.rs
//! Source registry: per-source metadata, selector fallback chains, and link
//! filters, loaded once at process start.
//!
//! Selector strings and filter patterns are compiled here, not at scrape
//! time: a registry that fails to compile is a fatal startup error, never a
//! mid-job surprise. Source kind is a tagged variant so kind-specific
//! extraction dispatch is a `match`, not string comparisons.

use regex::Regex;
use scraper::Selector;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ScrapeError;

pub const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";
pub const ENV_SOURCES_PATH: &str = "ESG_SOURCES_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Html,
    Rss,
    Blog,
}

/// One step of a selector fallback chain. `attr = "content"` style rules read
/// an attribute value instead of element text (meta-tag dates and the like).
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorRule {
    pub selector: String,
    #[serde(default)]
    pub attr: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkFilters {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleSelectors {
    #[serde(default)]
    pub title: Vec<SelectorRule>,
    #[serde(default)]
    pub content: Vec<SelectorRule>,
    #[serde(default)]
    pub date: Vec<SelectorRule>,
    #[serde(default)]
    pub author: Vec<SelectorRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub base_url: Option<String>,
    pub kind: SourceKind,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub link_selectors: Vec<SelectorRule>,
    #[serde(default)]
    pub article_selectors: ArticleSelectors,
    #[serde(default)]
    pub link_filters: LinkFilters,
    #[serde(default)]
    pub rss_feeds: Vec<String>,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Deserialize)]
struct RegistryFile {
    #[serde(default)]
    sources: Vec<SourceConfig>,
}

/* ----------------------------
Compiled structures
---------------------------- */

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub selector: Selector,
    pub attr: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledFilters {
    pub allow: Vec<Regex>,
    pub deny: Vec<Regex>,
}

impl CompiledFilters {
    /// An href passes when it matches any allow pattern (or none are
    /// configured) and matches no deny pattern.
    pub fn accepts(&self, href: &str) -> bool {
        if !self.allow.is_empty() && !self.allow.iter().any(|re| re.is_match(href)) {
            return false;
        }
        !self.deny.iter().any(|re| re.is_match(href))
    }
}

#[derive(Debug, Clone)]
pub struct CompiledFields {
    pub title: Vec<CompiledRule>,
    pub content: Vec<CompiledRule>,
    pub date: Vec<CompiledRule>,
    pub author: Vec<CompiledRule>,
}

#[derive(Debug, Clone)]
pub struct Source {
    pub cfg: SourceConfig,
    pub link_selectors: Vec<CompiledRule>,
    pub fields: CompiledFields,
    pub filters: CompiledFilters,
}

#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

fn compile_rule(source_id: &str, rule: &SelectorRule) -> Result<CompiledRule, ScrapeError> {
    let selector = Selector::parse(&rule.selector).map_err(|e| {
        ScrapeError::config(format!(
            "source `{source_id}`: bad selector `{}`: {e}",
            rule.selector
        ))
    })?;
    Ok(CompiledRule {
        selector,
        attr: rule.attr.clone(),
    })
}

fn compile_chain(source_id: &str, rules: &[SelectorRule]) -> Result<Vec<CompiledRule>, ScrapeError> {
    rules.iter().map(|r| compile_rule(source_id, r)).collect()
}

fn compile_patterns(source_id: &str, pats: &[String]) -> Result<Vec<Regex>, ScrapeError> {
    pats.iter()
        .map(|p| {
            Regex::new(p).map_err(|e| {
                ScrapeError::config(format!("source `{source_id}`: bad link filter `{p}`: {e}"))
            })
        })
        .collect()
}

fn rule(selector: &str, attr: Option<&str>) -> SelectorRule {
    SelectorRule {
        selector: selector.to_string(),
        attr: attr.map(str::to_string),
    }
}

impl Source {
    fn compile(mut cfg: SourceConfig) -> Result<Self, ScrapeError> {
        if cfg.id.trim().is_empty() {
            return Err(ScrapeError::config("source with empty id"));
        }
        if cfg.name.trim().is_empty() {
            return Err(ScrapeError::config(format!(
                "source `{}` has an empty name",
                cfg.id
            )));
        }
        if cfg.kind == SourceKind::Rss && cfg.rss_feeds.is_empty() {
            return Err(ScrapeError::config(format!(
                "rss source `{}` lists no rss_feeds",
                cfg.id
            )));
        }
        if let Some(base) = &cfg.base_url {
            url::Url::parse(base).map_err(|e| {
                ScrapeError::config(format!("source `{}`: bad base_url `{base}`: {e}", cfg.id))
            })?;
        }

        // Default chains keep per-source TOML short: anchors for discovery,
        // h1/p for fields, meta + <time> for dates.
        if cfg.link_selectors.is_empty() {
            cfg.link_selectors = vec![rule("a[href]", Some("href"))];
        }
        if cfg.article_selectors.title.is_empty() {
            cfg.article_selectors.title = vec![rule("h1", None)];
        }
        if cfg.article_selectors.content.is_empty() {
            cfg.article_selectors.content = vec![rule("article p", None), rule("p", None)];
        }
        if cfg.article_selectors.date.is_empty() {
            cfg.article_selectors.date = vec![
                rule("meta[property=\"article:published_time\"]", Some("content")),
                rule("time[datetime]", Some("datetime")),
            ];
        }

        let link_selectors = compile_chain(&cfg.id, &cfg.link_selectors)?;
        let fields = CompiledFields {
            title: compile_chain(&cfg.id, &cfg.article_selectors.title)?,
            content: compile_chain(&cfg.id, &cfg.article_selectors.content)?,
            date: compile_chain(&cfg.id, &cfg.article_selectors.date)?,
            author: compile_chain(&cfg.id, &cfg.article_selectors.author)?,
        };
        let filters = CompiledFilters {
            allow: compile_patterns(&cfg.id, &cfg.link_filters.allow)?,
            deny: compile_patterns(&cfg.id, &cfg.link_filters.deny)?,
        };

        Ok(Self {
            cfg,
            link_selectors,
            fields,
            filters,
        })
    }

    pub fn id(&self) -> &str {
        &self.cfg.id
    }

    pub fn language(&self) -> &str {
        &self.cfg.language
    }
}

impl SourceRegistry {
    /// Load the registry using env var + fallback:
    /// 1) $ESG_SOURCES_PATH
    /// 2) config/sources.toml
    pub fn load_default() -> Result<Self, ScrapeError> {
        let path = std::env::var(ENV_SOURCES_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SOURCES_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ScrapeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::config(format!(
                "reading source registry from {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ScrapeError> {
        let file: RegistryFile =
            toml::from_str(s).map_err(|e| ScrapeError::config(format!("registry parse: {e}")))?;
        if file.sources.is_empty() {
            return Err(ScrapeError::config("registry defines no sources"));
        }
        let mut seen = std::collections::HashSet::new();
        let mut sources = Vec::with_capacity(file.sources.len());
        for cfg in file.sources {
            if !seen.insert(cfg.id.clone()) {
                return Err(ScrapeError::config(format!("duplicate source id `{}`", cfg.id)));
            }
            sources.push(Source::compile(cfg)?);
        }
        Ok(Self { sources })
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.cfg.id == id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[[sources]]
id = "reuters"
name = "Reuters"
base_url = "https://www.reuters.com"
kind = "html"
language = "en"
region = "Americas"
link_filters = { allow = ["/business/"], deny = ["/video/"] }

[[sources.article_selectors.title]]
selector = ".article-title"

[[sources.article_selectors.content]]
selector = ".article-body__content p"
"#;

    #[test]
    fn compiles_and_fills_defaults() {
        let reg = SourceRegistry::from_toml_str(MINIMAL).unwrap();
        let src = reg.get("reuters").unwrap();
        assert_eq!(src.cfg.kind, SourceKind::Html);
        // discovery default injected
        assert_eq!(src.link_selectors.len(), 1);
        // explicit title chain kept, date default injected
        assert_eq!(src.fields.title.len(), 1);
        assert_eq!(src.fields.date.len(), 2);
        assert_eq!(src.fields.date[0].attr.as_deref(), Some("content"));
    }

    #[test]
    fn link_filters_allow_then_deny() {
        let reg = SourceRegistry::from_toml_str(MINIMAL).unwrap();
        let f = &reg.get("reuters").unwrap().filters;
        assert!(f.accepts("/business/apple-results"));
        assert!(!f.accepts("/sports/game"));
        assert!(!f.accepts("/business/video/clip")); // deny wins over allow
    }

    #[test]
    fn bad_selector_is_fatal() {
        let toml = r#"
[[sources]]
id = "x"
name = "X"
kind = "html"
link_selectors = [{ selector = "a[" }]
"#;
        let err = SourceRegistry::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
    }

    #[test]
    fn rss_without_feeds_is_fatal() {
        let toml = r#"
[[sources]]
id = "feed"
name = "Feed"
kind = "rss"
"#;
        assert!(SourceRegistry::from_toml_str(toml).is_err());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let toml = r#"
[[sources]]
id = "a"
name = "A"
kind = "html"

[[sources]]
id = "a"
name = "A again"
kind = "html"
"#;
        assert!(SourceRegistry::from_toml_str(toml).is_err());
    }
}
