// src/sink.rs
//! Persistence boundary. The pipeline only ever talks to this trait; the
//! in-memory implementation below serves single runs and tests, a relational
//! store lives behind the same seam.
//!
//! Idempotence contract: `store_company` keyed on name/ticker,
//! `store_article` keyed on url (duplicate calls are no-ops returning the
//! existing id). Aggregate scores are append-only history, never mutated.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::aggregate::AggregateScore;
use crate::article::NormalizedArticle;

pub type CompanyId = u64;
pub type ArticleId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Inserted(ArticleId),
    /// URL already present; the existing record's id is returned.
    Duplicate(ArticleId),
}

impl StoreOutcome {
    pub fn id(&self) -> ArticleId {
        match self {
            StoreOutcome::Inserted(id) | StoreOutcome::Duplicate(id) => *id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, StoreOutcome::Inserted(_))
    }
}

/// Scraping activity record, one per company job.
#[derive(Debug, Clone)]
pub struct JobLog {
    pub search_query: String,
    pub articles_found: usize,
    pub processing_ms: u64,
    pub status: String,
    pub error_message: Option<String>,
}

#[async_trait]
pub trait Sink: Send + Sync {
    async fn store_company(
        &self,
        name: &str,
        ticker: Option<&str>,
        sector: Option<&str>,
    ) -> Result<CompanyId>;

    async fn store_article(
        &self,
        article: &NormalizedArticle,
        company_id: CompanyId,
    ) -> Result<StoreOutcome>;

    async fn store_aggregate_score(
        &self,
        company_id: CompanyId,
        score: &AggregateScore,
    ) -> Result<()>;

    async fn record_job(&self, company_id: CompanyId, log: &JobLog) -> Result<()>;

    /// URLs already held by the sink, used to warm-start the dedup index.
    async fn known_urls(&self) -> Result<Vec<String>>;
}

/* ----------------------------
In-memory sink
---------------------------- */

#[derive(Debug, Clone)]
struct CompanyRow {
    id: CompanyId,
    name: String,
    ticker: Option<String>,
    #[allow(dead_code)] // stored for parity with the relational schema
    sector: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    companies: Vec<CompanyRow>,
    articles_by_url: HashMap<String, (ArticleId, NormalizedArticle)>,
    scores: Vec<(CompanyId, AggregateScore)>,
    job_logs: Vec<(CompanyId, JobLog)>,
    next_company_id: CompanyId,
    next_article_id: ArticleId,
}

#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Mutex<Inner>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn article_count(&self) -> usize {
        self.inner.lock().expect("sink mutex poisoned").articles_by_url.len()
    }

    pub fn scores_for(&self, company_id: CompanyId) -> Vec<AggregateScore> {
        self.inner
            .lock()
            .expect("sink mutex poisoned")
            .scores
            .iter()
            .filter(|(id, _)| *id == company_id)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn job_log_count(&self) -> usize {
        self.inner.lock().expect("sink mutex poisoned").job_logs.len()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn store_company(
        &self,
        name: &str,
        ticker: Option<&str>,
        sector: Option<&str>,
    ) -> Result<CompanyId> {
        let mut inner = self.inner.lock().expect("sink mutex poisoned");
        if let Some(row) = inner.companies.iter().find(|c| {
            c.name.eq_ignore_ascii_case(name)
                || matches!((&c.ticker, ticker), (Some(a), Some(b)) if a.eq_ignore_ascii_case(b))
        }) {
            return Ok(row.id);
        }
        inner.next_company_id += 1;
        let id = inner.next_company_id;
        inner.companies.push(CompanyRow {
            id,
            name: name.to_string(),
            ticker: ticker.map(str::to_string),
            sector: sector.map(str::to_string),
        });
        Ok(id)
    }

    async fn store_article(
        &self,
        article: &NormalizedArticle,
        _company_id: CompanyId,
    ) -> Result<StoreOutcome> {
        let mut inner = self.inner.lock().expect("sink mutex poisoned");
        if let Some((id, _)) = inner.articles_by_url.get(article.url()) {
            return Ok(StoreOutcome::Duplicate(*id));
        }
        inner.next_article_id += 1;
        let id = inner.next_article_id;
        inner
            .articles_by_url
            .insert(article.url().to_string(), (id, article.clone()));
        Ok(StoreOutcome::Inserted(id))
    }

    async fn store_aggregate_score(
        &self,
        company_id: CompanyId,
        score: &AggregateScore,
    ) -> Result<()> {
        let mut inner = self.inner.lock().expect("sink mutex poisoned");
        inner.scores.push((company_id, score.clone()));
        Ok(())
    }

    async fn record_job(&self, company_id: CompanyId, log: &JobLog) -> Result<()> {
        let mut inner = self.inner.lock().expect("sink mutex poisoned");
        inner.job_logs.push((company_id, log.clone()));
        Ok(())
    }

    async fn known_urls(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().expect("sink mutex poisoned");
        Ok(inner.articles_by_url.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::ExtractedArticle;

    fn article(url: &str) -> NormalizedArticle {
        NormalizedArticle::new(
            ExtractedArticle {
                title: "T".into(),
                content: "c".into(),
                author: None,
                published_at: None,
                source_id: "s".into(),
                language: "en".into(),
                url: url.into(),
            },
            "clean text".into(),
            "clean text".into(),
        )
    }

    #[tokio::test]
    async fn store_company_is_idempotent_on_name_and_ticker() {
        let sink = MemorySink::new();
        let a = sink.store_company("Apple Inc.", Some("AAPL"), None).await.unwrap();
        let b = sink.store_company("apple inc.", None, None).await.unwrap();
        let c = sink.store_company("Apple Incorporated", Some("aapl"), None).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[tokio::test]
    async fn store_article_dedups_on_url() {
        let sink = MemorySink::new();
        let cid = sink.store_company("X", None, None).await.unwrap();
        let first = sink.store_article(&article("https://e.test/1"), cid).await.unwrap();
        let second = sink.store_article(&article("https://e.test/1"), cid).await.unwrap();
        assert!(first.is_new());
        assert!(!second.is_new());
        assert_eq!(first.id(), second.id());
        assert_eq!(sink.article_count(), 1);
    }

    #[tokio::test]
    async fn scores_are_append_only_history() {
        use crate::aggregate::{aggregate, PillarWeights};
        use crate::company::Company;
        let sink = MemorySink::new();
        let cid = sink.store_company("X", None, None).await.unwrap();
        let score = aggregate(&Company::new("X"), &[], &PillarWeights::default(), chrono::Utc::now());
        sink.store_aggregate_score(cid, &score).await.unwrap();
        sink.store_aggregate_score(cid, &score).await.unwrap();
        assert_eq!(sink.scores_for(cid).len(), 2);
    }
}
