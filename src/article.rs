// src/article.rs
//! Article records as they move through the pipeline. A `RawPage` dies after
//! extraction; extracted and normalized articles are immutable once built and
//! are handed to the sink exactly once. The URL is the global dedup key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fetched page body plus provenance. Ephemeral, never persisted.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub url: String,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedArticle {
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source_id: String,
    pub language: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedArticle {
    #[serde(flatten)]
    pub article: ExtractedArticle,
    /// Markup-free text in the source language.
    pub cleaned_text: String,
    /// Target-language text; equals `cleaned_text` when no translation ran.
    pub translated_text: String,
    pub word_count: usize,
}

impl NormalizedArticle {
    pub fn new(article: ExtractedArticle, cleaned_text: String, translated_text: String) -> Self {
        let word_count = cleaned_text.split_whitespace().count();
        Self {
            article,
            cleaned_text,
            translated_text,
            word_count,
        }
    }

    pub fn url(&self) -> &str {
        &self.article.url
    }
}
