//! ESG News Scorer binary entrypoint.
//! Loads configuration and the source registry, then runs scoring jobs for
//! the requested companies and prints one JSON result line per job.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use esg_news_scorer::classify::{build_classifier, KeywordConfig};
use esg_news_scorer::company::load_companies_from;
use esg_news_scorer::config::AppConfig;
use esg_news_scorer::pipeline::{all_jobs_failed, Pipeline};
use esg_news_scorer::registry::SourceRegistry;
use esg_news_scorer::scrape::HttpFetcher;
use esg_news_scorer::sink::MemorySink;
use esg_news_scorer::translate::build_translator;

/// Command-line arguments for one scoring run.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to the target-company list (TOML)
    #[arg(short, long, default_value = "config/companies.toml")]
    companies: PathBuf,

    /// Only consider articles published within this many days
    #[arg(short, long, default_value_t = 30)]
    days_back: i64,

    /// Cap on matched article links per source per company
    #[arg(short, long, default_value_t = 25)]
    max_articles: usize,

    /// Skip the remote translation provider (articles pass through untranslated)
    #[arg(long)]
    offline: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("esg_news_scorer=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op elsewhere.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    // Configuration problems are fatal before any job runs.
    let mut config = AppConfig::load_default().context("loading settings")?;
    if cli.offline {
        config.translation.offline = true;
    }
    let registry = Arc::new(SourceRegistry::load_default().context("loading source registry")?);
    let companies = load_companies_from(&cli.companies).context("loading companies")?;

    let keywords = KeywordConfig::load_from_file("config/esg_keywords.toml");
    let classifier = build_classifier(&config.scoring, &keywords).context("building classifier")?;
    let translator = build_translator(&config.translation, &config.fetch.user_agent);
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch));
    let sink = Arc::new(MemorySink::new());

    tracing::info!(
        companies = companies.len(),
        sources = registry.len(),
        days_back = cli.days_back,
        "starting scoring run"
    );

    let pipeline = Pipeline::new(config, registry, fetcher, translator, classifier, sink);
    let results = pipeline
        .run(&companies, cli.days_back, cli.max_articles)
        .await;

    for result in &results {
        println!("{}", serde_json::to_string(result)?);
    }

    // Non-zero exit only when every company's job errored.
    if all_jobs_failed(&results) {
        anyhow::bail!("all {} company jobs failed", results.len());
    }
    Ok(())
}
