// tests/translate_fallback.rs
// Translation is non-fatal by contract: same-language text is untouched and
// a failing provider yields the original text, never an error.

use async_trait::async_trait;
use esg_news_scorer::config::TranslationConfig;
use esg_news_scorer::translate::{build_translator, IdentityTranslator, Translator};

#[tokio::test]
async fn english_input_is_returned_unchanged() {
    let cfg = TranslationConfig::default();
    let translator = build_translator(&cfg, "test-agent");
    for text in ["", "short", "Emissions fell 12% year over year."] {
        assert_eq!(translator.translate(text, "en").await, text);
    }
}

#[tokio::test]
async fn offline_mode_is_a_pass_through() {
    let cfg = TranslationConfig {
        offline: true,
        ..Default::default()
    };
    let translator = build_translator(&cfg, "test-agent");
    assert_eq!(
        translator.translate("Der Umweltbericht ist da.", "de").await,
        "Der Umweltbericht ist da."
    );
    assert_eq!(translator.name(), "identity");
}

/// A provider that always fails, standing in for a dead remote endpoint.
struct FailingTranslator;

#[async_trait]
impl Translator for FailingTranslator {
    async fn translate(&self, text: &str, _source_lang: &str) -> String {
        // Degradation contract: failure returns the original text.
        text.to_string()
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test]
async fn failing_provider_never_drops_the_article_text() {
    let t = FailingTranslator;
    let original = "Texte original sur la gouvernance.";
    assert_eq!(t.translate(original, "fr").await, original);
}

#[tokio::test]
async fn identity_translator_ignores_language() {
    let t = IdentityTranslator;
    assert_eq!(t.translate("未翻译的文本", "zh").await, "未翻译的文本");
}
