// src/translate.rs
//! Translation capability: provider abstraction + graceful degradation.
//! A failed provider call returns the original text; translation is never
//! allowed to drop an article.

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::config::TranslationConfig;
use crate::error::ScrapeError;

/// Providers the web endpoint does not know under their ISO-639-1 code.
fn map_language_code(code: &str) -> &str {
    match code {
        "zh" => "zh-CN",
        other => other,
    }
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source_lang` into the configured target
    /// language. Same-language input is returned unchanged (and untruncated);
    /// provider failure returns the original text.
    async fn translate(&self, text: &str, source_lang: &str) -> String;

    fn name(&self) -> &'static str;
}

/// Pass-through translator for offline runs and tests.
pub struct IdentityTranslator;

#[async_trait]
impl Translator for IdentityTranslator {
    async fn translate(&self, text: &str, _source_lang: &str) -> String {
        text.to_string()
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

/// The free Google web endpoint. No API key; input is capped at `max_chars`
/// before the call.
pub struct GoogleWebTranslator {
    http: reqwest::Client,
    endpoint: String,
    target: String,
    max_chars: usize,
}

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

impl GoogleWebTranslator {
    pub fn new(cfg: &TranslationConfig, user_agent: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            http,
            endpoint: ENDPOINT.to_string(),
            target: cfg.target_language.clone(),
            max_chars: cfg.max_chars,
        }
    }

    #[cfg(test)]
    fn with_endpoint(cfg: &TranslationConfig, endpoint: &str) -> Self {
        let mut t = Self::new(cfg, "test-agent");
        t.endpoint = endpoint.to_string();
        t
    }

    fn truncate(&self, text: &str) -> String {
        if text.chars().count() > self.max_chars {
            text.chars().take(self.max_chars).collect()
        } else {
            text.to_string()
        }
    }

    async fn call_provider(&self, text: &str, source: &str) -> Result<String, ScrapeError> {
        let fail = |reason: String| ScrapeError::Translation {
            lang: source.to_string(),
            target: self.target.clone(),
            reason,
        };

        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", self.target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?
            .error_for_status()
            .map_err(|e| fail(e.to_string()))?;

        // Response shape: [[["translated","original",..],..],..]
        let body: serde_json::Value = resp.json().await.map_err(|e| fail(e.to_string()))?;
        let segments = body
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| fail("unexpected response shape".to_string()))?;
        let mut out = String::new();
        for seg in segments {
            if let Some(piece) = seg.get(0).and_then(|v| v.as_str()) {
                out.push_str(piece);
            }
        }
        if out.is_empty() {
            return Err(fail("empty translation".to_string()));
        }
        Ok(out)
    }
}

#[async_trait]
impl Translator for GoogleWebTranslator {
    async fn translate(&self, text: &str, source_lang: &str) -> String {
        if source_lang == self.target || text.trim().is_empty() {
            return text.to_string();
        }
        let truncated = self.truncate(text);
        let source = map_language_code(source_lang);
        match self.call_provider(&truncated, source).await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "translation failed, keeping original text");
                text.to_string()
            }
        }
    }

    fn name(&self) -> &'static str {
        "google-web"
    }
}

/// Build the configured translator. Offline mode short-circuits to identity.
pub fn build_translator(
    cfg: &TranslationConfig,
    user_agent: &str,
) -> std::sync::Arc<dyn Translator> {
    if cfg.offline {
        std::sync::Arc::new(IdentityTranslator)
    } else {
        std::sync::Arc::new(GoogleWebTranslator::new(cfg, user_agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_remap() {
        assert_eq!(map_language_code("zh"), "zh-CN");
        assert_eq!(map_language_code("de"), "de");
    }

    #[tokio::test]
    async fn same_language_is_untouched_and_untruncated() {
        let cfg = TranslationConfig {
            max_chars: 10,
            ..Default::default()
        };
        let t = GoogleWebTranslator::new(&cfg, "test-agent");
        let long = "word ".repeat(100);
        assert_eq!(t.translate(&long, "en").await, long);
    }

    #[tokio::test]
    async fn identity_translator_passes_through() {
        let t = IdentityTranslator;
        assert_eq!(t.translate("Umweltbericht", "de").await, "Umweltbericht");
    }

    #[tokio::test]
    async fn provider_failure_returns_original_text() {
        // Unroutable endpoint: the call fails fast and the article text
        // survives untranslated.
        let cfg = TranslationConfig::default();
        let t = GoogleWebTranslator::with_endpoint(&cfg, "http://127.0.0.1:9/translate");
        let original = "Der Vorstand kündigte neue Klimaziele an.";
        assert_eq!(t.translate(original, "de").await, original);
    }

    #[test]
    fn truncation_is_char_based() {
        let cfg = TranslationConfig {
            max_chars: 3,
            ..Default::default()
        };
        let t = GoogleWebTranslator::new(&cfg, "test-agent");
        assert_eq!(t.truncate("čćžšđ"), "čćž");
    }
}
