//! Government meetings scraper (gov.ro).
//!
//! The meetings page groups press releases in `div.sedinte_lista` containers
//! whose `id` carries the meeting day, e.g. `sed_04_Iun`. Only links whose
//! text mentions the marker token (`informatie`) are kept: those are the
//! press releases listing the adopted acts.
//!
//! # Identifiers
//!
//! The container id is the item id and, with the prefix stripped, the date
//! label (`04_Iun`).

use super::{ContentSelectors, FetchedPage, SourceAdapter, fetch_page, resolve_url};
use crate::config::{ListingConfig, SourceConfig};
use crate::errors::{IngestError, Result};
use crate::extractor::parse_selector;
use crate::http::PageFetcher;
use crate::models::{CandidateItem, Source};
use crate::utils::normalize_whitespace;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use itertools::Itertools;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use url::Url;

#[derive(Debug)]
pub struct MeetingsAdapter<F> {
    source: Source,
    listing_url: String,
    base: Url,
    container: Selector,
    link: Selector,
    id_prefix: String,
    marker: String,
    content: ContentSelectors,
    fetcher: Arc<F>,
}

impl<F: PageFetcher> MeetingsAdapter<F> {
    pub fn new(config: &SourceConfig, fetcher: Arc<F>) -> Result<Self> {
        let ListingConfig::Meetings {
            container_selector,
            link_selector,
            id_prefix,
            marker,
        } = &config.listing
        else {
            return Err(IngestError::Config(format!(
                "source '{}' is not configured with a meetings listing",
                config.key
            )));
        };
        let base = Url::parse(&config.base_url)
            .map_err(|e| IngestError::Config(format!("source '{}' base_url: {e}", config.key)))?;

        Ok(Self {
            source: config.key,
            listing_url: config.listing_url.clone(),
            base,
            container: parse_selector(container_selector)?,
            link: parse_selector(link_selector)?,
            id_prefix: id_prefix.clone(),
            marker: marker.to_lowercase(),
            content: ContentSelectors::new(&config.content_selectors)?,
            fetcher,
        })
    }

    /// Extract candidates from a parsed meetings page.
    pub fn parse_listing(&self, doc: &Html) -> Vec<CandidateItem> {
        let mut items = Vec::new();
        for container in doc.select(&self.container) {
            let Some(div_id) = container.value().attr("id") else {
                continue;
            };
            let Some(date_label) = div_id.strip_prefix(self.id_prefix.as_str()) else {
                continue;
            };

            for link in container.select(&self.link) {
                let Some(url) = link.value().attr("href").and_then(|h| resolve_url(&self.base, h)) else {
                    continue;
                };
                let title = normalize_whitespace(&link.text().collect::<String>());
                if !title.is_empty() && title.to_lowercase().contains(&self.marker) {
                    items.push(CandidateItem {
                        id: div_id.to_string(),
                        url,
                        title,
                        date_label: date_label.to_string(),
                    });
                }
            }
        }
        // one press release per meeting; later links would reuse the container id
        items.into_iter().unique_by(|i| i.id.clone()).collect()
    }

    #[instrument(level = "info", skip(self), fields(source = %self.source))]
    async fn discover_items(&self) -> Vec<CandidateItem> {
        let html = match self.fetcher.get_text(&self.listing_url).await {
            Ok(html) => html,
            Err(e) => {
                error!(url = %self.listing_url, error = %e, "Meetings listing fetch failed");
                return Vec::new();
            }
        };
        let items = self.parse_listing(&Html::parse_document(&html));
        info!(count = items.len(), url = %self.listing_url, "Indexed meeting press releases");
        debug!(ids = ?items.iter().map(|i| &i.id).collect::<Vec<_>>(), "Meeting ids");
        items
    }
}

impl<F: PageFetcher + 'static> SourceAdapter for MeetingsAdapter<F> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::http::testing::CannedFetcher;

    const LISTING: &str = r#"
        <html><body>
          <div class="sedinte_lista" id="sed_04_Iun">
            <a href="/ro/guvernul/sedinte-guvern/informatie-de-presa-04-iunie">Informatie de presă privind actele normative adoptate</a>
            <a href="/ro/guvernul/sedinte-guvern/agenda-04-iunie">Agenda ședinței</a>
            <a href="/ro/guvernul/sedinte-guvern/informatie-suplimentara">Informatie suplimentară</a>
          </div>
          <div class="sedinte_lista" id="sed_28_Mai">
            <a href="https://gov.ro/ro/guvernul/sedinte-guvern/informatie-28-mai">INFORMATIE de presă 28 mai</a>
          </div>
          <div class="sedinte_lista" id="arhiva">
            <a href="/ro/arhiva">Informatie arhivă</a>
          </div>
          <div class="sedinte_lista">
            <a href="/ro/fara-id">Informatie fără id</a>
          </div>
        </body></html>
    "#;

    fn adapter(fetcher: CannedFetcher) -> MeetingsAdapter<CannedFetcher> {
        let config = AppConfig::embedded().unwrap();
        MeetingsAdapter::new(config.source(Source::Gov).unwrap(), Arc::new(fetcher)).unwrap()
    }

    #[test]
    fn test_parse_listing() {
        let adapter = adapter(CannedFetcher::default());
        let items = adapter.parse_listing(&Html::parse_document(LISTING));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "sed_04_Iun");
        assert_eq!(items[0].date_label, "04_Iun");
        assert_eq!(
            items[0].url,
            "https://gov.ro/ro/guvernul/sedinte-guvern/informatie-de-presa-04-iunie"
        );
        assert_eq!(items[0].title, "Informatie de presă privind actele normative adoptate");
        assert_eq!(items[1].id, "sed_28_Mai");
        assert_eq!(items[1].date_label, "28_Mai");
    }

    #[tokio::test]
    async fn test_discover_via_fetcher() {
        let config = AppConfig::embedded().unwrap();
        let gov = config.source(Source::Gov).unwrap();
        let fetcher = CannedFetcher::default().with_page(&gov.listing_url, LISTING);
        let adapter = adapter(fetcher);
        let items = adapter.discover().await;
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_discover_failure_is_empty() {
        let adapter = adapter(CannedFetcher::default());
        assert!(adapter.discover().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_content_uses_source_selectors() {
        let url = "https://gov.ro/ro/guvernul/sedinte-guvern/informatie-de-presa-04-iunie";
        let page = r#"<div id="content"><div class="description"><p>HOTĂRÂRE   privind</p></div></div>"#;
        let adapter = adapter(CannedFetcher::default().with_page(url, page));
        let fetched = adapter.fetch_content(url).await;
        assert_eq!(fetched.text, "HOTĂRÂRE privind");
        assert!(fetched.document.is_some());
    }

    #[test]
    fn test_wrong_listing_kind_rejected() {
        let config = AppConfig::embedded().unwrap();
        let res = MeetingsAdapter::new(
            config.source(Source::Ms).unwrap(),
            Arc::new(CannedFetcher::default()),
        );
        assert!(res.is_err());
    }
}
