// src/pipeline.rs
//! Per-company scoring jobs: discovery → fetch → extract → filter →
//! translate → classify → aggregate → persist.
//!
//! Failure policy (the whole point of this module): per-URL and per-source
//! problems are logged and skipped, never propagated. A job only fails
//! outright when *no* source was reachable during discovery. Companies run
//! concurrently; the fetcher's semaphore is the real throttle, and the only
//! cross-job state is the URL dedup index.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, PillarWeights};
use crate::article::{ExtractedArticle, NormalizedArticle};
use crate::classify::{ClassificationResult, EsgClassifier};
use crate::company::Company;
use crate::config::AppConfig;
use crate::date_filter::DateFilter;
use crate::dedup::UrlIndex;
use crate::error::ScrapeError;
use crate::normalize::normalize;
use crate::registry::{SourceKind, SourceRegistry};
use crate::scrape::{collect_anchors, extract_article, LinkMatcher, PageFetcher};
use crate::sink::{CompanyId, JobLog, Sink};
use crate::translate::Translator;

/// Article fetches in flight per company job. The global request semaphore
/// still applies on top of this.
const PER_JOB_FETCH_FANOUT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Fetching,
    Extracting,
    Filtering,
    Translating,
    Classifying,
    Aggregated,
    Persisted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Partial,
    Error,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct JobResult {
    pub company: String,
    pub articles_found: usize,
    pub articles_saved: usize,
    pub status: JobStatus,
    pub error_detail: Option<String>,
    pub processing_ms: u64,
}

/// One discovered article candidate. RSS items carry their feed date along
/// as a fallback for pages that don't expose one.
#[derive(Debug, Clone)]
struct Candidate {
    url: String,
    source_idx: usize,
    feed_date: Option<chrono::DateTime<Utc>>,
}

/// Extraction-phase output: field data plus the cleaned page text.
struct PendingArticle {
    extracted: ExtractedArticle,
    cleaned_text: String,
}

enum ExtractOutcome {
    Extracted(Box<PendingArticle>),
    /// Duplicate, stale, or empty; not an error.
    Skipped,
    /// Network or store trouble; counts toward `partial` status.
    Failed,
}

pub struct Pipeline {
    config: AppConfig,
    registry: Arc<SourceRegistry>,
    fetcher: Arc<dyn PageFetcher>,
    translator: Arc<dyn Translator>,
    classifier: Arc<dyn EsgClassifier>,
    sink: Arc<dyn Sink>,
    dedup: Arc<UrlIndex>,
    date_filter: DateFilter,
    weights: PillarWeights,
}

impl Pipeline {
    pub fn new(
        config: AppConfig,
        registry: Arc<SourceRegistry>,
        fetcher: Arc<dyn PageFetcher>,
        translator: Arc<dyn Translator>,
        classifier: Arc<dyn EsgClassifier>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        let date_filter = DateFilter::new(&config.filter);
        let weights = PillarWeights::from(&config.scoring);
        Self {
            config,
            registry,
            fetcher,
            translator,
            classifier,
            sink,
            dedup: Arc::new(UrlIndex::new()),
            date_filter,
            weights,
        }
    }

    /// Run scoring jobs for every company. Jobs are independent and run
    /// concurrently; result order follows completion, not input. The
    /// aggregation itself is order-invariant.
    pub async fn run(
        &self,
        companies: &[Company],
        days_back: i64,
        max_articles: usize,
    ) -> Vec<JobResult> {
        match self.sink.known_urls().await {
            Ok(urls) => {
                self.dedup.extend(urls);
                debug!(known = self.dedup.len(), "warm-started dedup index");
            }
            Err(e) => warn!(error = ?e, "could not warm-start dedup index"),
        }

        stream::iter(companies.iter().cloned())
            .map(|company| self.run_company(company, days_back, max_articles))
            .buffer_unordered(companies.len().max(1))
            .collect()
            .await
    }

    /// Discovery: candidate URLs for one company across all sources.
    /// Returns (candidates, reachable_source_count, soft_failure_count).
    async fn discover(
        &self,
        company: &Company,
        max_articles: usize,
    ) -> (Vec<Candidate>, usize, usize) {
        let matcher = LinkMatcher::new(self.config.scoring.fuzzy_match_threshold, max_articles);
        let supported = &self.config.translation.supported_languages;
        let mut candidates = Vec::new();
        let mut reachable = 0usize;
        let mut failures = 0usize;

        for (idx, source) in self.registry.sources().iter().enumerate() {
            if !supported.iter().any(|l| l == source.language()) {
                debug!(
                    source = source.id(),
                    lang = source.language(),
                    "skipping unsupported language"
                );
                continue;
            }
            match source.cfg.kind {
                SourceKind::Html | SourceKind::Blog => {
                    let Some(base) = source.cfg.base_url.as_deref() else {
                        debug!(source = source.id(), "no base_url, skipping source");
                        continue;
                    };
                    match self.fetcher.fetch(base).await {
                        Ok(page) => {
                            reachable += 1;
                            let anchors = collect_anchors(&page.body, source);
                            let urls = matcher.select_urls(&anchors, company, Some(base));
                            info!(
                                source = source.id(),
                                company = %company.name,
                                links = urls.len(),
                                "matched listing links"
                            );
                            candidates.extend(urls.into_iter().map(|url| Candidate {
                                url,
                                source_idx: idx,
                                feed_date: None,
                            }));
                        }
                        Err(e) => {
                            warn!(error = %e, source = source.id(), "listing fetch failed");
                            failures += 1;
                        }
                    }
                }
                SourceKind::Rss => {
                    for feed_url in &source.cfg.rss_feeds {
                        match self.fetcher.fetch(feed_url).await {
                            Ok(page) => match crate::scrape::rss::parse_feed(&page.body) {
                                Ok(items) => {
                                    reachable += 1;
                                    let anchors: Vec<(String, String)> = items
                                        .iter()
                                        .map(|it| (it.title.clone(), it.link.clone()))
                                        .collect();
                                    let urls = matcher.select_urls(
                                        &anchors,
                                        company,
                                        source.cfg.base_url.as_deref(),
                                    );
                                    for url in urls {
                                        let feed_date = items
                                            .iter()
                                            .find(|it| it.link == url)
                                            .and_then(|it| it.published_at);
                                        candidates.push(Candidate {
                                            url,
                                            source_idx: idx,
                                            feed_date,
                                        });
                                    }
                                }
                                Err(e) => {
                                    warn!(error = ?e, feed = %feed_url, "feed parse failed");
                                    failures += 1;
                                }
                            },
                            Err(e) => {
                                warn!(error = %e, feed = %feed_url, "feed fetch failed");
                                failures += 1;
                            }
                        }
                    }
                }
            }
        }

        (candidates, reachable, failures)
    }

    /// Extraction: fetch one candidate page and pull fields off it.
    async fn extract_candidate(&self, candidate: Candidate, deadline: Instant) -> ExtractOutcome {
        // The job deadline aborts only fetches that have not started;
        // everything already extracted still flows into aggregation.
        if Instant::now() >= deadline {
            debug!(url = %candidate.url, "job deadline reached, dropping remaining fetch");
            return ExtractOutcome::Skipped;
        }

        // Duplicate URLs are skipped silently; this is not an error.
        if !self.dedup.claim(&candidate.url) {
            debug!(url = %candidate.url, "duplicate url, skipping");
            return ExtractOutcome::Skipped;
        }

        let source = &self.registry.sources()[candidate.source_idx];

        let page = match self.fetcher.fetch(&candidate.url).await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, url = %candidate.url, "article fetch failed");
                return ExtractOutcome::Failed;
            }
        };

        let mut extracted = extract_article(&page.body, source, &candidate.url);
        if extracted.published_at.is_none() {
            extracted.published_at = candidate.feed_date;
        }

        // Selector misses on content fall back to the whole visible page,
        // so a drifted source still yields classifiable text.
        let cleaned_text = if extracted.content.is_empty() {
            debug!(
                error = %ScrapeError::Extraction {
                    source_id: source.id().to_string(),
                    field: "content",
                },
                url = %candidate.url,
                "selector chain missed, falling back to page text"
            );
            normalize(&page.body)
        } else {
            normalize(&extracted.content)
        };
        if cleaned_text.is_empty() {
            debug!(url = %candidate.url, "no visible text after normalization");
            return ExtractOutcome::Skipped;
        }

        ExtractOutcome::Extracted(Box::new(PendingArticle {
            extracted,
            cleaned_text,
        }))
    }

    /// Run one company job through the full state machine.
    pub async fn run_company(
        &self,
        company: Company,
        days_back: i64,
        max_articles: usize,
    ) -> JobResult {
        let started = Instant::now();
        let deadline = started + Duration::from_secs(self.config.fetch.job_timeout_secs);
        let mut state = JobState::Pending;
        info!(company = %company.name, ?state, "job started");

        let company_id = match self
            .sink
            .store_company(
                &company.name,
                company.ticker.as_deref(),
                company.sector.as_deref(),
            )
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(error = ?e, company = %company.name, "company store failed");
                0
            }
        };

        state = JobState::Fetching;
        debug!(company = %company.name, ?state, "discovering candidates");
        let (candidates, reachable, discovery_failures) =
            self.discover(&company, max_articles).await;

        if reachable == 0 {
            // FAILED is only reachable from PENDING/FETCHING: nothing was
            // reachable, so there is nothing to aggregate.
            state = JobState::Failed;
            warn!(company = %company.name, ?state, "no source reachable");
            let result = JobResult {
                company: company.name.clone(),
                articles_found: 0,
                articles_saved: 0,
                status: JobStatus::Error,
                error_detail: Some("no source reachable".to_string()),
                processing_ms: started.elapsed().as_millis() as u64,
            };
            self.log_job(company_id, days_back, &result).await;
            return result;
        }

        let mut soft_failures = discovery_failures;

        state = JobState::Extracting;
        debug!(company = %company.name, ?state, candidates = candidates.len(), "extracting");
        let outcomes: Vec<ExtractOutcome> = stream::iter(candidates)
            .map(|candidate| self.extract_candidate(candidate, deadline))
            .buffer_unordered(PER_JOB_FETCH_FANOUT)
            .collect()
            .await;

        let mut pending = Vec::new();
        for outcome in outcomes {
            match outcome {
                ExtractOutcome::Extracted(p) => pending.push(*p),
                ExtractOutcome::Skipped => {}
                ExtractOutcome::Failed => soft_failures += 1,
            }
        }

        state = JobState::Filtering;
        let before = pending.len();
        let now = Utc::now();
        pending.retain(|p| {
            self.date_filter
                .passes(p.extracted.published_at, days_back, now)
        });
        debug!(
            company = %company.name,
            ?state,
            kept = pending.len(),
            dropped = before - pending.len(),
            "date filter applied"
        );

        state = JobState::Translating;
        debug!(company = %company.name, ?state, articles = pending.len(), "translating");
        let articles: Vec<NormalizedArticle> = stream::iter(pending)
            .map(|p| async move {
                let translated = self
                    .translator
                    .translate(&p.cleaned_text, &p.extracted.language)
                    .await;
                NormalizedArticle::new(p.extracted, p.cleaned_text, translated)
            })
            .buffer_unordered(PER_JOB_FETCH_FANOUT)
            .collect()
            .await;

        state = JobState::Classifying;
        debug!(company = %company.name, ?state, "classifying");
        let mut results: Vec<ClassificationResult> = Vec::with_capacity(articles.len());
        let mut saved = 0usize;
        for article in &articles {
            let mut result = self.classifier.classify(&article.translated_text).await;
            result.company = company.name.clone();
            results.push(result);

            match self.sink.store_article(article, company_id).await {
                Ok(outcome) if outcome.is_new() => saved += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = ?e, url = %article.article.url, "article store failed");
                    soft_failures += 1;
                }
            }
        }

        state = JobState::Aggregated;
        let score = aggregate(&company, &results, &self.weights, Utc::now());
        info!(
            company = %company.name,
            ?state,
            articles = score.articles_analyzed,
            overall = score.overall,
            "aggregated"
        );

        if let Err(e) = self.sink.store_aggregate_score(company_id, &score).await {
            warn!(error = ?e, company = %company.name, "score store failed");
            soft_failures += 1;
        } else {
            state = JobState::Persisted;
        }

        let status = if soft_failures == 0 {
            JobStatus::Success
        } else {
            JobStatus::Partial
        };
        let result = JobResult {
            company: company.name.clone(),
            articles_found: results.len(),
            articles_saved: saved,
            status,
            error_detail: (soft_failures > 0)
                .then(|| format!("{soft_failures} item(s) skipped after soft failures")),
            processing_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            company = %company.name,
            ?state,
            found = result.articles_found,
            saved = result.articles_saved,
            status = ?result.status,
            "job finished"
        );
        self.log_job(company_id, days_back, &result).await;
        result
    }

    async fn log_job(&self, company_id: CompanyId, days_back: i64, result: &JobResult) {
        let log = JobLog {
            search_query: format!("news:{}:last_{days_back}d", result.company),
            articles_found: result.articles_found,
            processing_ms: result.processing_ms,
            status: format!("{:?}", result.status).to_lowercase(),
            error_message: result.error_detail.clone(),
        };
        if let Err(e) = self.sink.record_job(company_id, &log).await {
            warn!(error = ?e, company = %result.company, "job log failed");
        }
    }
}

/// True when the whole batch failed; the process exit code keys off this.
pub fn all_jobs_failed(results: &[JobResult]) -> bool {
    !results.is_empty() && results.iter().all(|r| r.status == JobStatus::Error)
}
