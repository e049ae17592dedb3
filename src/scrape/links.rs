// src/scrape/links.rs
//! Candidate-link discovery: pull (anchor text, href) pairs off a listing
//! page, then keep the ones plausibly about a target company.
//!
//! Matching precedence: exact case-insensitive alias substring first, then
//! fuzzy similarity of the whole anchor against the company name
//! (`strsim::normalized_levenshtein`, cutoff 0.65 by default). Relative
//! hrefs resolve against the source base_url; a source with no base_url
//! simply yields fewer candidates, never an error.

use scraper::Html;
use strsim::normalized_levenshtein;
use url::Url;

use crate::company::Company;
use crate::registry::Source;

/// Collect (anchor text, href) pairs using the source's link-selector chain.
/// The first selector that yields any filtered anchors wins; later selectors
/// are fallbacks for markup drift, not additive sources.
pub fn collect_anchors(html: &str, source: &Source) -> Vec<(String, String)> {
    let doc = Html::parse_document(html);
    for rule in &source.link_selectors {
        let attr = rule.attr.as_deref().unwrap_or("href");
        let mut found = Vec::new();
        for el in doc.select(&rule.selector) {
            let Some(href) = el.value().attr(attr) else {
                continue;
            };
            let href = href.trim();
            if href.is_empty() || !source.filters.accepts(href) {
                continue;
            }
            let text = el.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            found.push((text, href.to_string()));
        }
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

#[derive(Debug, Clone)]
pub struct LinkMatcher {
    threshold: f64,
    max_articles: usize,
}

impl LinkMatcher {
    pub fn new(threshold: f64, max_articles: usize) -> Self {
        Self {
            threshold,
            max_articles,
        }
    }

    /// True when the anchor text plausibly references the company.
    pub fn matches(&self, anchor_text: &str, company: &Company) -> bool {
        let text = anchor_text.to_lowercase();
        if text.is_empty() {
            return false;
        }
        if company.aliases().iter().any(|a| text.contains(a)) {
            return true;
        }
        normalized_levenshtein(&company.name.to_lowercase(), &text) >= self.threshold
    }

    /// Resolve matching anchors to absolute URLs, capped at `max_articles`,
    /// preserving listing order.
    pub fn select_urls(
        &self,
        anchors: &[(String, String)],
        company: &Company,
        base_url: Option<&str>,
    ) -> Vec<String> {
        let base = base_url.and_then(|b| Url::parse(b).ok());
        let mut out = Vec::new();
        for (text, href) in anchors {
            if out.len() >= self.max_articles {
                break;
            }
            if !self.matches(text, company) {
                continue;
            }
            if let Some(url) = resolve(href, base.as_ref()) {
                if !out.contains(&url) {
                    out.push(url);
                }
            }
        }
        out
    }
}

fn resolve(href: &str, base: Option<&Url>) -> Option<String> {
    if let Ok(abs) = Url::parse(href) {
        // Listing pages carry mailto:/javascript: anchors too.
        if abs.scheme() == "http" || abs.scheme() == "https" {
            return Some(abs.to_string());
        }
        return None;
    }
    base.and_then(|b| b.join(href).ok()).map(|u| u.to_string())
}
