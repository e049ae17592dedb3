// src/company.rs
//! Target companies and the alias set used for anchor-text matching.
//!
//! Aliases are derived, not configured: the full name, the first and last
//! tokens of the name, and the ticker when present. "Apple Inc." therefore
//! matches anchors mentioning "Apple" without a per-company alias table.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::ScrapeError;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Company {
    pub name: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticker: None,
            sector: None,
            region: None,
        }
    }

    pub fn with_ticker(name: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticker: Some(ticker.into()),
            sector: None,
            region: None,
        }
    }

    /// Lower-cased alias set, ordered and deduplicated.
    pub fn aliases(&self) -> Vec<String> {
        let mut set = BTreeSet::new();
        let name = self.name.trim();
        if !name.is_empty() {
            set.insert(name.to_lowercase());
        }
        let words: Vec<&str> = name.split_whitespace().collect();
        if words.len() > 1 {
            set.insert(words[0].to_lowercase());
            set.insert(words[words.len() - 1].to_lowercase());
        }
        if let Some(t) = &self.ticker {
            let t = t.trim();
            if !t.is_empty() {
                set.insert(t.to_lowercase());
            }
        }
        set.into_iter().collect()
    }

    /// Identity check: case-insensitive name, or exact ticker.
    pub fn is_same(&self, name: &str, ticker: Option<&str>) -> bool {
        if self.name.eq_ignore_ascii_case(name.trim()) {
            return true;
        }
        match (&self.ticker, ticker) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b.trim()),
            _ => false,
        }
    }
}

#[derive(Deserialize)]
struct CompanyFile {
    #[serde(default)]
    companies: Vec<Company>,
}

/// Load target companies from a TOML file (`[[companies]]` entries with
/// name/ticker/sector/region). An empty list is a configuration error: the
/// pipeline has nothing to do.
pub fn load_companies_from(path: &Path) -> Result<Vec<Company>, ScrapeError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ScrapeError::config(format!("reading companies from {}: {e}", path.display()))
    })?;
    let file: CompanyFile =
        toml::from_str(&content).map_err(|e| ScrapeError::config(format!("companies parse: {e}")))?;
    if file.companies.is_empty() {
        return Err(ScrapeError::config(format!(
            "{} lists no companies",
            path.display()
        )));
    }
    for c in &file.companies {
        if c.name.trim().is_empty() {
            return Err(ScrapeError::config("company with empty name"));
        }
    }
    Ok(file.companies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_include_first_last_and_ticker() {
        let c = Company {
            name: "Apple Inc.".to_string(),
            ticker: Some("AAPL".to_string()),
            sector: Some("Technology".to_string()),
            region: Some("Americas".to_string()),
        };
        let aliases = c.aliases();
        assert!(aliases.contains(&"apple inc.".to_string()));
        assert!(aliases.contains(&"apple".to_string()));
        assert!(aliases.contains(&"inc.".to_string()));
        assert!(aliases.contains(&"aapl".to_string()));
    }

    #[test]
    fn single_word_name_has_no_partials() {
        let c = Company::new("Siemens");
        assert_eq!(c.aliases(), vec!["siemens".to_string()]);
    }

    #[test]
    fn identity_by_name_or_ticker() {
        let c = Company::with_ticker("Johnson & Johnson", "JNJ");
        assert!(c.is_same("johnson & johnson", None));
        assert!(c.is_same("Somebody Else", Some("jnj")));
        assert!(!c.is_same("Johnson", None));
    }
}
