// src/normalize.rs
//! Text normalization: strip non-content markup, decode entities, collapse
//! whitespace. The output is what the translator and classifier see.

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

/// Elements whose entire subtree is boilerplate, not article text.
const NON_CONTENT: [&str; 7] = [
    "script", "style", "nav", "footer", "aside", "noscript", "iframe",
];

static RE_NON_CONTENT: Lazy<Vec<Regex>> = Lazy::new(|| {
    NON_CONTENT
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("non-content regex")
        })
        .collect()
});

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"))
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// Normalize an HTML fragment or document into plain visible text.
///
/// 1) Drop script/style/nav/footer/aside subtrees
/// 2) Strip remaining tags
/// 3) Decode HTML entities
/// 4) Collapse whitespace runs to single spaces, trim ends
pub fn normalize(html: &str) -> String {
    let mut no_boilerplate = html.to_string();
    for re in RE_NON_CONTENT.iter() {
        no_boilerplate = re.replace_all(&no_boilerplate, " ").into_owned();
    }
    let no_tags = re_tags().replace_all(&no_boilerplate, " ");
    let decoded = html_escape::decode_html_entities(&no_tags).to_string();
    let collapsed = re_ws().replace_all(&decoded, " ");
    collapsed.trim().to_string()
}
