//! Source adapters for the monitored government sites.
//!
//! Every site is reached through the same two-phase contract, [`SourceAdapter`]:
//!
//! 1. **Discovery**: parse the listing page into [`CandidateItem`]s, newest first
//! 2. **Content**: download one article and extract its text
//!
//! # Adapters
//!
//! | Listing kind | Module | Used by | Identifier |
//! |--------------|--------|---------|------------|
//! | `meetings` | [`meetings`] | gov.ro | container id (`sed_04_Iun`) |
//! | `generic` | [`listing`] | ministries | synthesized `{source}_{ordinal}_{date}` |
//!
//! # Failure policy
//!
//! Adapters never return errors. Transport and parse problems are logged and
//! turned into an empty candidate list or an empty [`FetchedPage`], which the
//! coordinator skips.

pub mod listing;
pub mod meetings;

use crate::config::{AppConfig, ListingConfig, SourceConfig};
use crate::errors::{IngestError, Result};
use crate::extractor::parse_selector;
use crate::http::PageFetcher;
use crate::models::{CandidateItem, Source};
use crate::utils::normalize_whitespace;
use futures::future::LocalBoxFuture;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

/// A downloaded article.
#[derive(Debug)]
pub struct FetchedPage {
    /// Whitespace-normalized article text; empty when nothing was extracted.
    pub text: String,
    /// The parsed page, kept for selector-based point extraction.
    pub document: Option<Html>,
}

impl FetchedPage {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            document: None,
        }
    }
}

/// Discovery and content extraction for one site.
pub trait SourceAdapter {
    fn source(&self) -> Source;

    /// Candidates in listing order, newest first. Empty on any failure.
    fn discover(&self) -> LocalBoxFuture<'_, Vec<CandidateItem>>;

    /// Article text for `url`. Empty text on any failure.
    fn fetch_content<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, FetchedPage>;
}

/// Ordered content selectors with a paragraph fallback.
#[derive(Debug)]
pub struct ContentSelectors {
    candidates: Vec<Selector>,
    paragraph: Selector,
}

impl ContentSelectors {
    pub fn new(selectors: &[String]) -> Result<Self> {
        Ok(Self {
            candidates: selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<Vec<_>>>()?,
            paragraph: parse_selector("p")?,
        })
    }

    /// Text of the first matching candidate, or of every paragraph when no
    /// candidate matches.
    pub fn extract(&self, doc: &Html) -> String {
        let selected = self
            .candidates
            .iter()
            .find_map(|s| doc.select(s).next())
            .map(|el| el.text().collect::<Vec<_>>().join(" "));

        let content = match selected {
            Some(text) if !text.trim().is_empty() => text,
            _ => doc
                .select(&self.paragraph)
                .map(|p| p.text().collect::<String>())
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        };
        normalize_whitespace(&content)
    }
}

/// Download and parse one article page.
pub(crate) async fn fetch_page<F: PageFetcher>(
    fetcher: &F,
    selectors: &ContentSelectors,
    source: Source,
    url: &str,
) -> FetchedPage {
    let body = match fetcher.get_text(url).await {
        Ok(body) => body,
        Err(e) => {
            error!(%source, %url, error = %e, "Article fetch failed");
            return FetchedPage::empty();
        }
    };
    let document = Html::parse_document(&body);
    let text = selectors.extract(&document);
    if text.is_empty() {
        let e = IngestError::Parse(format!("no content selector or paragraph matched {url}"));
        warn!(%source, error = %e, "No article text found");
    } else {
        info!(%source, %url, chars = text.chars().count(), "Extracted article text");
    }
    FetchedPage {
        text,
        document: Some(document),
    }
}

/// Resolve a possibly relative `href` against the site's base URL.
pub(crate) fn resolve_url(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|u| u.to_string())
}

/// Build one adapter per configured source, in configuration order.
///
/// Fails only on configuration problems such as unparsable selectors.
pub fn build_adapters<F>(config: &AppConfig, fetcher: Arc<F>) -> Result<Vec<Box<dyn SourceAdapter>>>
where
    F: PageFetcher + 'static,
{
    config
        .sources
        .iter()
        .map(|source| build_adapter(source, Arc::clone(&fetcher)))
        .collect()
}

fn build_adapter<F>(source: &SourceConfig, fetcher: Arc<F>) -> Result<Box<dyn SourceAdapter>>
where
    F: PageFetcher + 'static,
{
    Ok(match &source.listing {
        ListingConfig::Meetings { .. } => Box::new(meetings::MeetingsAdapter::new(source, fetcher)?),
        ListingConfig::Generic { .. } => Box::new(listing::ListingAdapter::new(source, fetcher)?),
    })
}
