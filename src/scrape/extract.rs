// src/scrape/extract.rs
//! Field extraction over ordered selector-fallback chains.
//!
//! Per field the chain is walked in order and the first selector producing
//! non-empty text (or attribute value) wins. This tolerates markup drift
//! across sources without per-source code: a redesigned site falls through
//! to the next selector instead of breaking the job. Unmatched fields stay
//! empty; the title additionally falls back to the page `<title>`.
//!
//! All functions here are synchronous: `scraper::Html` is not `Send`, so
//! documents are parsed and dropped without ever crossing an await point.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::article::ExtractedArticle;
use crate::date_filter::parse_published;
use crate::registry::{CompiledRule, Source};

static TITLE_TAG: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("title selector"));

fn element_text(el: scraper::ElementRef<'_>) -> String {
    let text = el.text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Walk a fallback chain; first selector with a non-empty yield wins.
/// Text rules concatenate every matched node with a single space.
fn eval_chain(doc: &Html, chain: &[CompiledRule]) -> Option<String> {
    for rule in chain {
        let value = match &rule.attr {
            Some(attr) => doc
                .select(&rule.selector)
                .filter_map(|el| el.value().attr(attr))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .map(str::to_string),
            None => {
                let joined = doc
                    .select(&rule.selector)
                    .map(element_text)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                (!joined.is_empty()).then_some(joined)
            }
        };
        if value.is_some() {
            return value;
        }
    }
    None
}

fn generic_title(doc: &Html) -> Option<String> {
    doc.select(&TITLE_TAG)
        .map(element_text)
        .find(|t| !t.is_empty())
}

/// Extract one article from fetched HTML using the source's field chains.
pub fn extract_article(html: &str, source: &Source, url: &str) -> ExtractedArticle {
    let doc = Html::parse_document(html);

    let title = eval_chain(&doc, &source.fields.title)
        .or_else(|| generic_title(&doc))
        .unwrap_or_default();
    let content = eval_chain(&doc, &source.fields.content).unwrap_or_default();
    let author = eval_chain(&doc, &source.fields.author);
    let published_at = eval_chain(&doc, &source.fields.date)
        .as_deref()
        .and_then(parse_published);

    ExtractedArticle {
        title,
        content,
        author,
        published_at,
        source_id: source.id().to_string(),
        language: source.language().to_string(),
        url: url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SourceRegistry;

    fn source_with(selectors: &str) -> SourceRegistry {
        let toml = format!(
            r#"
[[sources]]
id = "t"
name = "Test"
kind = "html"
{selectors}
"#
        );
        SourceRegistry::from_toml_str(&toml).unwrap()
    }

    #[test]
    fn first_matching_selector_wins() {
        let reg = source_with(
            r#"
[[sources.article_selectors.title]]
selector = ".headline"

[[sources.article_selectors.title]]
selector = "h1"
"#,
        );
        let html = r#"<h1>Fallback Headline</h1><p>Body.</p>"#;
        let a = extract_article(html, reg.get("t").unwrap(), "https://x.test/1");
        // .headline missing, chain falls through to h1
        assert_eq!(a.title, "Fallback Headline");
    }

    #[test]
    fn content_concatenates_all_matches() {
        let reg = source_with("");
        let html = "<article><p>First.</p><p>Second.</p></article>";
        let a = extract_article(html, reg.get("t").unwrap(), "https://x.test/1");
        assert_eq!(a.content, "First. Second.");
    }

    #[test]
    fn title_falls_back_to_title_tag() {
        let reg = source_with("");
        let html = "<html><head><title>Page Title</title></head><body><p>x</p></body></html>";
        let a = extract_article(html, reg.get("t").unwrap(), "https://x.test/1");
        assert_eq!(a.title, "Page Title");
    }

    #[test]
    fn meta_date_attribute_is_parsed() {
        let reg = source_with("");
        let html = r#"<html><head>
            <meta property="article:published_time" content="2025-05-06T09:00:00Z">
            </head><body><h1>T</h1><p>c</p></body></html>"#;
        let a = extract_article(html, reg.get("t").unwrap(), "https://x.test/1");
        assert!(a.published_at.is_some());
    }

    #[test]
    fn time_datetime_is_second_in_the_default_chain() {
        let reg = source_with("");
        let html = r#"<body><time datetime="2025-04-01T08:30:00+00:00">April 1</time>
            <h1>T</h1><p>c</p></body>"#;
        let a = extract_article(html, reg.get("t").unwrap(), "https://x.test/1");
        assert!(a.published_at.is_some());
    }

    #[test]
    fn malformed_date_leaves_article_undated() {
        let reg = source_with("");
        let html = r#"<body><time datetime="last tuesday">?</time><h1>T</h1><p>c</p></body>"#;
        let a = extract_article(html, reg.get("t").unwrap(), "https://x.test/1");
        assert!(a.published_at.is_none());
    }

    #[test]
    fn unmatched_fields_stay_empty() {
        let reg = source_with("");
        let a = extract_article("<div>nothing useful</div>", reg.get("t").unwrap(), "u");
        assert!(a.title.is_empty());
        assert!(a.content.is_empty());
        assert!(a.author.is_none());
    }
}
