//! # gov_kids_news
//!
//! Watches Romanian government web sites for new press releases and rewrites
//! them into a form a young child can follow. Results accumulate in a single
//! JSON document read by the front-end.
//!
//! ## Usage
//!
//! ```sh
//! gov_kids_news --store ./scraped_articles.json --at 09:00
//! ```
//!
//! ## Architecture
//!
//! Every pass runs sequentially:
//! 1. **Discovery**: each source adapter lists candidate articles, newest first
//! 2. **Fetching**: article pages are downloaded until the source's watermark
//! 3. **Processing**: classification, point extraction and simplification
//! 4. **Persistence**: new records are prepended to the stored set
//!
//! After the startup pass the process checks once a minute whether the daily
//! run time has come.

use chrono::{Local, NaiveDate, NaiveTime};
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod classifier;
mod cli;
mod config;
mod errors;
mod extractor;
mod http;
mod models;
mod pipeline;
mod scrapers;
mod search;
mod simplifier;
mod store;
mod utils;

use cli::Cli;
use config::AppConfig;
use http::HttpFetcher;
use pipeline::{Coordinator, Watermarks};
use scrapers::{SourceAdapter, build_adapters};
use search::{ArticleQuery, Glossary};
use store::{JsonStore, MemoryStore, RecordStore};
use utils::{ensure_writable_parent, pass_is_due};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("gov_kids_news starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Configuration problems are the only fatal errors
    let config = AppConfig::load(args.config.as_deref()).await.inspect_err(|e| {
        error!(error = %e, fatal = e.is_fatal(), "Invalid configuration; aborting");
    })?;
    if let Some(term) = &args.explain {
        return explain_term(&config, term);
    }
    if args.is_search() {
        return search_store(&config, &args).await;
    }

    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    let adapters = build_adapters(&config, fetcher).inspect_err(|e| {
        error!(error = %e, "Could not build source adapters; aborting");
    })?;

    if args.dry_run {
        let seed = JsonStore::new(&args.store).load().await.unwrap_or_else(|e| {
            error!(error = %e, "Could not read store; dry run starts empty");
            Vec::new()
        });
        info!(records = seed.len(), "Dry run: store will not be written");
        run(&config, adapters, MemoryStore::with_records(seed), &args).await
    } else {
        if let Err(e) = ensure_writable_parent(&args.store).await {
            error!(path = %args.store, error = %e, "Store location is not writable");
            return Err(e.into());
        }
        let store = JsonStore::new(&args.store);
        info!(path = %store.path().display(), "Using store");
        run(&config, adapters, store, &args).await
    }
}

/// Print the glossary explanation of `term`.
fn explain_term(config: &AppConfig, term: &str) -> Result<(), Box<dyn Error>> {
    match Glossary::new(&config.glossary).explain(term) {
        Some(entry) => {
            println!("{}: {}", entry.term, entry.explanation);
            Ok(())
        }
        None => {
            error!(%term, "Term not in glossary");
            Err(format!("unknown legal term '{term}'").into())
        }
    }
}

/// Print stored articles matching the search flags as JSON.
#[instrument(level = "info", skip_all, fields(store = %args.store))]
async fn search_store(config: &AppConfig, args: &Cli) -> Result<(), Box<dyn Error>> {
    let records = JsonStore::new(&args.store).load().await.inspect_err(|e| {
        error!(error = %e, "Could not read store for search");
    })?;
    let query = ArticleQuery::new(
        args.search.as_deref(),
        args.document_type.as_deref(),
        args.subject.as_deref(),
    );
    if query.is_empty() {
        info!("No search criteria left after ignoring \"all\"; listing every article");
    }
    let glossary = Glossary::new(&config.glossary);
    let hits = search::search(&records, &query, &glossary);
    info!(total = records.len(), hits = hits.len(), "Search complete");
    println!("{}", serde_json::to_string_pretty(&hits)?);
    Ok(())
}

/// Startup pass followed, unless `--once`, by the daily schedule.
async fn run<S: RecordStore>(
    config: &AppConfig,
    adapters: Vec<Box<dyn SourceAdapter>>,
    store: S,
    args: &Cli,
) -> Result<(), Box<dyn Error>> {
    let mut coordinator = Coordinator::new(config, adapters, store)?;
    if let Some(ms) = args.source_delay_ms {
        coordinator = coordinator.with_source_delay(Duration::from_millis(ms));
    }
    let mut watermarks = coordinator.load_watermarks().await;

    let started = Local::now().naive_local();
    run_daily_check(&coordinator, &mut watermarks).await;
    if args.once {
        return Ok(());
    }

    // a startup pass after the daily time counts as today's run
    let last_run = (started.time() >= args.at).then(|| started.date());
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl-C; stop the process externally");
            std::future::pending::<()>().await;
        }
    };
    run_scheduler(&coordinator, &mut watermarks, args.at, last_run, shutdown).await;
    Ok(())
}

/// Check once per minute whether the daily pass is due, until `shutdown`
/// resolves.
///
/// `shutdown` is created once and polled across ticks, so a signal that
/// arrives while a pass is running still ends the loop afterwards.
async fn run_scheduler<S, F>(
    coordinator: &Coordinator<'_, S>,
    watermarks: &mut Watermarks,
    at: NaiveTime,
    mut last_run: Option<NaiveDate>,
    shutdown: F,
) where
    S: RecordStore,
    F: Future<Output = ()>,
{
    info!(at = %at.format("%H:%M"), "Scheduler running; checking once per minute");
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(Duration::from_secs(60));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Local::now().naive_local();
                if pass_is_due(now, at, last_run) {
                    last_run = Some(now.date());
                    run_daily_check(coordinator, watermarks).await;
                }
            }
            _ = &mut shutdown => {
                info!("Stopped by user");
                break;
            }
        }
    }
}

#[instrument(level = "info", skip_all)]
async fn run_daily_check<S: RecordStore>(coordinator: &Coordinator<'_, S>, watermarks: &mut Watermarks) {
    info!("Running daily check");
    let report = coordinator.run_pass(watermarks).await;

    if report.new_records.is_empty() {
        info!("No new articles found");
    } else {
        info!(count = report.new_records.len(), persisted = report.persisted, "Found new articles");
        for record in &report.new_records {
            info!(source = %record.source, id = %record.id, title = %record.title, "New article");
        }
    }
}
