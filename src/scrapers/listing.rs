//! Generic listing scraper used for the ministry press-release pages.
//!
//! The first `max_items` elements matching the item selector are taken in page
//! order. Within each, the title selector supplies the headline and (usually)
//! the link.
//!
//! # Identifiers
//!
//! Ministry listings expose no stable per-item token, so ids are synthesized
//! as `{source}_{ordinal}_{YYYY-MM-DD}`. Two runs on the same day produce the
//! same id for the same listing position, which is what stops a second run at
//! the watermark.

use super::{ContentSelectors, FetchedPage, SourceAdapter, fetch_page, resolve_url};
use crate::config::{ListingConfig, SourceConfig};
use crate::errors::{IngestError, Result};
use crate::extractor::parse_selector;
use crate::http::PageFetcher;
use crate::models::{CandidateItem, Source};
use crate::utils::normalize_whitespace;
use chrono::{Local, NaiveDate};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use url::Url;

#[derive(Debug)]
pub struct ListingAdapter<F> {
    source: Source,
    listing_url: String,
    base: Url,
    item: Selector,
    title: Selector,
    date: Option<Selector>,
    anchor: Selector,
    max_items: usize,
    content: ContentSelectors,
    fetcher: Arc<F>,
}

impl<F: PageFetcher> ListingAdapter<F> {
    pub fn new(config: &SourceConfig, fetcher: Arc<F>) -> Result<Self> {
        let ListingConfig::Generic {
            item_selector,
            title_selector,
            date_selector,
            max_items,
        } = &config.listing
        else {
            return Err(IngestError::Config(format!(
                "source '{}' is not configured with a generic listing",
                config.key
            )));
        };
        let base = Url::parse(&config.base_url)
            .map_err(|e| IngestError::Config(format!("source '{}' base_url: {e}", config.key)))?;

        Ok(Self {
            source: config.key,
            listing_url: config.listing_url.clone(),
            base,
            item: parse_selector(item_selector)?,
            title: parse_selector(title_selector)?,
            date: date_selector.as_deref().map(parse_selector).transpose()?,
            anchor: parse_selector("a[href]")?,
            max_items: *max_items,
            content: ContentSelectors::new(&config.content_selectors)?,
            fetcher,
        })
    }

    /// Extract candidates from a parsed listing page as seen on `today`.
    pub fn parse_listing(&self, doc: &Html, today: NaiveDate) -> Vec<CandidateItem> {
        let day = today.format("%Y-%m-%d").to_string();
        let fallback_label = today.format("%d.%m.%Y").to_string();

        doc.select(&self.item)
            .take(self.max_items)
            .enumerate()
            .filter_map(|(ordinal, item)| {
                let title_el = item.select(&self.title).next()?;
                let title = normalize_whitespace(&title_el.text().collect::<String>());
                if title.is_empty() {
                    return None;
                }
                let url = self.link_of(item, title_el)?;
                let date_label = self
                    .date
                    .as_ref()
                    .and_then(|s| item.select(s).next())
                    .map(|d| normalize_whitespace(&d.text().collect::<String>()))
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| fallback_label.clone());

                Some(CandidateItem {
                    id: format!("{}_{}_{}", self.source, ordinal, day),
                    url,
                    title,
                    date_label,
                })
            })
            .collect()
    }

    /// The title's own `href`, else the first link inside the item.
    fn link_of(&self, item: ElementRef<'_>, title: ElementRef<'_>) -> Option<String> {
        let href = title
            .value()
            .attr("href")
            .or_else(|| item.select(&self.anchor).next()?.value().attr("href"))?;
        resolve_url(&self.base, href)
    }

    #[instrument(level = "info", skip(self), fields(source = %self.source))]
    async fn discover_items(&self) -> Vec<CandidateItem> {
        let html = match self.fetcher.get_text(&self.listing_url).await {
            Ok(html) => html,
            Err(e) => {
                error!(url = %self.listing_url, error = %e, "Listing fetch failed");
                return Vec::new();
            }
        };
        let items = self.parse_listing(&Html::parse_document(&html), Local::now().date_naive());
        info!(count = items.len(), url = %self.listing_url, "Indexed listing items");
        debug!(urls = ?items.iter().map(|i| &i.url).collect::<Vec<_>>(), "Listing URLs");
        items
    }
}

impl<F: PageFetcher + 'static> SourceAdapter for ListingAdapter<F> {
    fn source(&self) -> Source {
        self.source
    }

    fn discover(&self) -> LocalBoxFuture<'_, Vec<CandidateItem>> {
        self.discover_items().boxed_local()
    }

    fn fetch_content<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, FetchedPage> {
        fetch_page(self.fetcher.as_ref(), &self.content, self.source, url).boxed_local()
    }
}
