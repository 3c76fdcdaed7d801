//! Command-line interface definitions for gov_kids_news.
//!
//! All options can be given as flags; the store and configuration paths can
//! also come from the environment.

use crate::utils::parse_daily_time;
use chrono::NaiveTime;
use clap::Parser;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Run once and exit
/// gov_kids_news --once
///
/// # Keep running, checking every day at 07:30, with a custom store
/// gov_kids_news --store /var/lib/kids/articles.json --at 07:30
///
/// # Try a configuration without touching the store
/// gov_kids_news --config ./sources.yaml --dry-run --once
///
/// # Search the store instead of scraping
/// gov_kids_news --search scoala --document-type hotarare --subject education
///
/// # Explain a legal term
/// gov_kids_news --explain "ordonanță de urgență"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path of the JSON document holding every processed article
    #[arg(short, long, env = "GOV_KIDS_NEWS_STORE", default_value = "scraped_articles.json")]
    pub store: String,

    /// Optional path to a YAML configuration replacing the built-in one
    #[arg(short, long, env = "GOV_KIDS_NEWS_CONFIG")]
    pub config: Option<String>,

    /// Run a single pass and exit instead of scheduling daily checks
    #[arg(long)]
    pub once: bool,

    /// Local time of the daily check, as HH:MM
    #[arg(long, default_value = "09:00", value_parser = parse_daily_time)]
    pub at: NaiveTime,

    /// Process sources but never write the store
    #[arg(long)]
    pub dry_run: bool,

    /// Override the pause between two sources, in milliseconds
    #[arg(long)]
    pub source_delay_ms: Option<u64>,

    /// Search stored articles for this text (case and diacritics ignored) and exit
    #[arg(long)]
    pub search: Option<String>,

    /// Only stored articles of this document type, e.g. "hotărâre" ("all" for any)
    #[arg(long)]
    pub document_type: Option<String>,

    /// Only stored articles about this subject or category key ("all" for any)
    #[arg(long)]
    pub subject: Option<String>,

    /// Print the explanation of a legal term and exit
    #[arg(long, conflicts_with_all = ["search", "document_type", "subject"])]
    pub explain: Option<String>,
}

impl Cli {
    /// Whether any search criterion was given.
    pub fn is_search(&self) -> bool {
        self.search.is_some() || self.document_type.is_some() || self.subject.is_some()
    }
}
