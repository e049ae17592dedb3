// src/error.rs
//! Failure taxonomy for the scraping-to-score pipeline.
//!
//! Everything here except [`ScrapeError::Config`] is a *local* failure: the
//! caller logs it and moves on to the next URL, field, or article. Config
//! errors are fatal at startup, before any job runs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Fetch timeout, connection failure, or non-2xx status. Skip the URL.
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    /// No selector in a fallback chain matched the field. Leave it empty.
    #[error("no selector matched field `{field}` for source `{source_id}`")]
    Extraction { source_id: String, field: &'static str },

    /// Translation provider call failed. Caller keeps the original text.
    #[error("translation failed ({lang} -> {target}): {reason}")]
    Translation {
        lang: String,
        target: String,
        reason: String,
    },

    /// Malformed date value. Caller treats the article as undated.
    #[error("unparseable date value: {0:?}")]
    DateParse(String),

    /// Missing or malformed registry/settings entry. Fatal at startup.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
