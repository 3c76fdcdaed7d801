//! Incremental ingestion coordinator.
//!
//! One pass walks the sources in configuration order. For each source the
//! candidates are processed newest first until the list is exhausted or the
//! source's watermark (the id of the newest record already stored) is reached:
//!
//! ```text
//! IDLE -> DISCOVERING -> FETCHING(item) -> PROCESSING(item) -> ... -> IDLE
//! ```
//!
//! New records of the pass are prepended to the stored set, which is then
//! written back as a whole. Stored records are never modified.

use crate::classifier::Classifier;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::extractor::PointExtractor;
use crate::models::{CandidateItem, Record, Source};
use crate::scrapers::{FetchedPage, SourceAdapter};
use crate::simplifier::Simplifier;
use crate::store::RecordStore;
use crate::utils::{truncate_content, truncate_for_log};
use chrono::Local;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Last processed item id per source.
pub type Watermarks = HashMap<Source, String>;

/// Watermarks implied by a stored record set: the first record of each
/// source, since the store is kept newest first.
pub fn watermarks_from(records: &[Record]) -> Watermarks {
    let mut marks = Watermarks::new();
    for record in records {
        marks
            .entry(record.source)
            .or_insert_with(|| record.id.clone());
    }
    marks
}

/// Outcome of one source within a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: Source,
    pub discovered: usize,
    pub new: usize,
    /// Candidates dropped because no content could be extracted.
    pub skipped: usize,
    /// The watermark was reached before the candidate list ran out.
    pub caught_up: bool,
}

/// Outcome of a full pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub sources: Vec<SourceReport>,
    /// Records created in this pass, in store order.
    pub new_records: Vec<Record>,
    /// Whether the merged set was written to the store.
    pub persisted: bool,
}

pub struct Coordinator<'a, S> {
    config: &'a AppConfig,
    adapters: Vec<Box<dyn SourceAdapter>>,
    store: S,
    classifier: Classifier<'a>,
    extractor: PointExtractor<'a>,
    simplifier: Simplifier<'a>,
    source_delay: Duration,
}

impl<'a, S: RecordStore> Coordinator<'a, S> {
    pub fn new(config: &'a AppConfig, adapters: Vec<Box<dyn SourceAdapter>>, store: S) -> Result<Self> {
        Ok(Self {
            config,
            adapters,
            store,
            classifier: Classifier::new(config),
            extractor: PointExtractor::new(config)?,
            simplifier: Simplifier::new(&config.simplifier),
            source_delay: Duration::from_millis(config.pipeline.source_delay_ms),
        })
    }

    pub fn with_source_delay(mut self, delay: Duration) -> Self {
        self.source_delay = delay;
        self
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Watermarks from the persisted store; empty when it cannot be read.
    pub async fn load_watermarks(&self) -> Watermarks {
        match self.store.load().await {
            Ok(records) => {
                let marks = watermarks_from(&records);
                info!(sources = marks.len(), "Loaded watermarks");
                marks
            }
            Err(e) => {
                error!(error = %e, "Could not read store; starting without watermarks");
                Watermarks::new()
            }
        }
    }

    /// Run one ingestion pass over every source.
    #[instrument(level = "info", skip_all)]
    pub async fn run_pass(&self, watermarks: &mut Watermarks) -> PassReport {
        let t0 = Instant::now();
        let mut new_records = Vec::new();
        let mut sources = Vec::with_capacity(self.adapters.len());

        for (i, adapter) in self.adapters.iter().enumerate() {
            if i > 0 && !self.source_delay.is_zero() {
                sleep(self.source_delay).await;
            }
            let report = self
                .process_source(adapter.as_ref(), watermarks, &mut new_records)
                .await;
            sources.push(report);
        }

        let persisted = !new_records.is_empty() && self.persist(&new_records).await;
        if persisted {
            // newest new record of each source becomes its watermark
            let mut advanced = HashSet::new();
            for record in &new_records {
                if advanced.insert(record.source) {
                    watermarks.insert(record.source, record.id.clone());
                }
            }
        }

        info!(
            new = new_records.len(),
            persisted,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Pass complete"
        );
        PassReport {
            sources,
            new_records,
            persisted,
        }
    }

    #[instrument(level = "info", skip_all, fields(source = %adapter.source()))]
    async fn process_source(
        &self,
        adapter: &dyn SourceAdapter,
        watermarks: &mut Watermarks,
        new_records: &mut Vec<Record>,
    ) -> SourceReport {
        let source = adapter.source();
        let candidates = adapter.discover().await;
        let mut report = SourceReport {
            source,
            discovered: candidates.len(),
            new: 0,
            skipped: 0,
            caught_up: false,
        };

        for item in candidates {
            if watermarks.get(&source) == Some(&item.id) {
                info!(id = %item.id, "Reached last processed item");
                report.caught_up = true;
                break;
            }

            let page = adapter.fetch_content(&item.url).await;
            if page.text.is_empty() {
                warn!(id = %item.id, url = %item.url, "No content; skipping item");
                report.skipped += 1;
                continue;
            }

            let record = self.build_record(source, &item, &page);
            info!(
                id = %record.id,
                category = %record.category,
                points = record.points.len(),
                title = %truncate_for_log(&record.title, 80),
                "Processed new item"
            );
            new_records.push(record);
            report.new += 1;

            watermarks
                .entry(source)
                .or_insert_with(|| item.id.clone());
        }

        info!(
            discovered = report.discovered,
            new = report.new,
            skipped = report.skipped,
            caught_up = report.caught_up,
            "Source done"
        );
        report
    }

    fn build_record(&self, source: Source, item: &CandidateItem, page: &FetchedPage) -> Record {
        let pipeline = &self.config.pipeline;
        let category = self.classifier.classify(&page.text, source);
        let points = self
            .extractor
            .extract_points(&page.text, page.document.as_ref(), source);
        let simplified_content = self.simplifier.simplify(&page.text, &category.key);

        Record {
            id: item.id.clone(),
            source,
            date: item.date_label.clone(),
            title: item.title.clone(),
            url: item.url.clone(),
            raw_content: truncate_content(&page.text, pipeline.max_content_length, &pipeline.truncation_marker),
            category: category.key,
            category_label: category.label,
            category_emoji: category.emoji,
            points,
            simplified_content,
            scraped_at: Local::now().to_rfc3339(),
            is_new: true,
        }
    }

    /// Prepend `new_records` to the stored set and write it back.
    async fn persist(&self, new_records: &[Record]) -> bool {
        let existing = match self.store.load().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Could not read store before merge; treating it as empty");
                Vec::new()
            }
        };
        let mut merged = Vec::with_capacity(new_records.len() + existing.len());
        merged.extend_from_slice(new_records);
        merged.extend(existing);

        match self.store.save(&merged).await {
            Ok(()) => {
                info!(total = merged.len(), new = new_records.len(), "Store updated");
                true
            }
            Err(e) => {
                error!(error = %e, lost = new_records.len(), "Store write failed; new records of this pass are lost");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_record;
    use crate::store::{JsonStore, MemoryStore};
    use futures::FutureExt;
    use futures::future::LocalBoxFuture;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Adapter replaying a fixed listing; every fetched URL is recorded.
    struct ScriptedAdapter {
        source: Source,
        items: Vec<CandidateItem>,
        pages: HashMap<String, String>,
        fetched: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptedAdapter {
        fn new(source: Source, ids: &[&str]) -> Self {
            let items: Vec<CandidateItem> = ids
                .iter()
                .map(|id| CandidateItem {
                    id: id.to_string(),
                    url: format!("https://example.ro/{id}"),
                    title: format!("Titlu {id}"),
                    date_label: "04.06.2025".to_string(),
                })
                .collect();
            let pages = items
                .iter()
                .map(|i| (i.url.clone(), format!("Comunicat {} despre spitale și vaccinare", i.id)))
                .collect();
            Self {
                source,
                items,
                pages,
                fetched: Rc::default(),
            }
        }

        fn with_page(mut self, id: &str, text: &str) -> Self {
            self.pages.insert(format!("https://example.ro/{id}"), text.to_string());
            self
        }
    }

    impl SourceAdapter for ScriptedAdapter {
        fn source(&self) -> Source {
            self.source
        }

        fn discover(&self) -> LocalBoxFuture<'_, Vec<CandidateItem>> {
            async move { self.items.clone() }.boxed_local()
        }

        fn fetch_content<'b>(&'b self, url: &'b str) -> LocalBoxFuture<'b, FetchedPage> {
            async move {
                self.fetched.borrow_mut().push(url.to_string());
                FetchedPage {
                    text: self.pages.get(url).cloned().unwrap_or_default(),
                    document: None,
                }
            }
            .boxed_local()
        }
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::embedded().unwrap();
        config.pipeline.source_delay_ms = 0;
        config
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_watermark_stops_source() {
        let config = config();
        let adapter = ScriptedAdapter::new(Source::Ms, &["A", "B", "C", "D"]);
        let fetched = Rc::clone(&adapter.fetched);
        let coordinator = Coordinator::new(&config, vec![Box::new(adapter)], MemoryStore::default()).unwrap();

        let mut marks = Watermarks::from([(Source::Ms, "C".to_string())]);
        let report = coordinator.run_pass(&mut marks).await;

        assert_eq!(ids(&report.new_records), vec!["A", "B"]);
        assert_eq!(
            *fetched.borrow(),
            vec!["https://example.ro/A".to_string(), "https://example.ro/B".to_string()]
        );
        assert!(report.sources[0].caught_up);
        assert_eq!(marks[&Source::Ms], "A");
    }

    #[tokio::test]
    async fn test_merge_prepends_new_records() {
        let config = config();
        let store = MemoryStore::with_records(vec![
            sample_record(Source::Ms, "X"),
            sample_record(Source::Ms, "Y"),
        ]);
        let adapter = ScriptedAdapter::new(Source::Ms, &["A", "B", "X", "Y"]);
        let coordinator = Coordinator::new(&config, vec![Box::new(adapter)], store).unwrap();

        let mut marks = coordinator.load_watermarks().await;
        assert_eq!(marks[&Source::Ms], "X");
        let report = coordinator.run_pass(&mut marks).await;

        assert!(report.persisted);
        assert_eq!(ids(&coordinator.store().snapshot()), vec!["A", "B", "X", "Y"]);
    }

    #[tokio::test]
    async fn test_empty_content_is_skipped_without_touching_watermark() {
        let config = config();
        let adapter = ScriptedAdapter::new(Source::Mai, &["A", "B", "C"]).with_page("A", "");
        let coordinator = Coordinator::new(&config, vec![Box::new(adapter)], MemoryStore::default()).unwrap();

        let mut marks = Watermarks::new();
        let report = coordinator.run_pass(&mut marks).await;

        assert_eq!(ids(&report.new_records), vec!["B", "C"]);
        assert_eq!(report.sources[0].skipped, 1);
        assert_eq!(marks[&Source::Mai], "B");
    }

    #[tokio::test]
    async fn test_caught_up_source_does_not_stop_others() {
        let config = config();
        let gov = ScriptedAdapter::new(Source::Gov, &["sed_04_Iun", "sed_28_Mai"]);
        let ms = ScriptedAdapter::new(Source::Ms, &["ms_0", "ms_1"]);
        let store = MemoryStore::with_records(vec![sample_record(Source::Gov, "sed_04_Iun")]);
        let coordinator =
            Coordinator::new(&config, vec![Box::new(gov), Box::new(ms)], store).unwrap();

        let mut marks = coordinator.load_watermarks().await;
        let report = coordinator.run_pass(&mut marks).await;

        assert_eq!(report.sources[0].new, 0);
        assert!(report.sources[0].caught_up);
        assert_eq!(ids(&report.new_records), vec!["ms_0", "ms_1"]);
        assert_eq!(marks[&Source::Gov], "sed_04_Iun");
        assert_eq!(marks[&Source::Ms], "ms_0");
        assert_eq!(
            ids(&coordinator.store().snapshot()),
            vec!["ms_0", "ms_1", "sed_04_Iun"]
        );
    }

    #[tokio::test]
    async fn test_second_run_finds_nothing_new() {
        let config = config();
        let adapter = ScriptedAdapter::new(Source::Edu, &["edu_0", "edu_1"]);
        let coordinator = Coordinator::new(&config, vec![Box::new(adapter)], MemoryStore::default()).unwrap();

        let mut marks = Watermarks::new();
        let first = coordinator.run_pass(&mut marks).await;
        assert_eq!(first.new_records.len(), 2);

        let second = coordinator.run_pass(&mut marks).await;
        assert!(second.new_records.is_empty());
        assert!(!second.persisted);
        assert_eq!(*coordinator.store().saves.borrow(), 1);
    }

    #[tokio::test]
    async fn test_records_are_fully_assembled() {
        let mut config = config();
        config.pipeline.max_content_length = 20;
        let long = "Spitalul județean primește fonduri pentru aparatură nouă și medici tineri";
        let adapter = ScriptedAdapter::new(Source::Ms, &["ms_0", "ms_1"]).with_page("ms_1", "Scurt");
        let adapter = adapter.with_page("ms_0", long);
        let coordinator = Coordinator::new(&config, vec![Box::new(adapter)], MemoryStore::default()).unwrap();

        let report = coordinator.run_pass(&mut Watermarks::new()).await;
        let long_record = &report.new_records[0];
        assert_eq!(long_record.raw_content.chars().count(), 20 + 3);
        assert!(long_record.raw_content.ends_with("..."));
        assert_eq!(long_record.category, "health");
        assert_eq!(long_record.category_emoji, "🏥");
        assert!(!long_record.points.is_empty() && long_record.points.len() <= 6);
        assert!(long_record.simplified_content.starts_with("Spitalul"));
        assert!(long_record.is_new);

        let short_record = &report.new_records[1];
        assert_eq!(short_record.raw_content, "Scurt");
        assert_eq!(short_record.category, "general");
        assert_eq!(short_record.date, "04.06.2025");
    }

    #[tokio::test]
    async fn test_failed_write_keeps_existing_store() {
        let config = config();
        let store = MemoryStore::with_records(vec![sample_record(Source::Mt, "mt_0")]).with_failing_writes();
        let adapter = ScriptedAdapter::new(Source::Mt, &["mt_new", "mt_0"]);
        let coordinator = Coordinator::new(&config, vec![Box::new(adapter)], store).unwrap();

        let mut marks = coordinator.load_watermarks().await;
        let report = coordinator.run_pass(&mut marks).await;

        assert_eq!(report.new_records.len(), 1);
        assert!(!report.persisted);
        assert_eq!(ids(&coordinator.store().snapshot()), vec!["mt_0"]);
        assert_eq!(marks[&Source::Mt], "mt_0");
    }

    #[tokio::test]
    async fn test_unreadable_store_means_fresh_start() {
        let config = config();
        let store = MemoryStore::with_records(vec![sample_record(Source::Ms, "X")]).with_failing_reads();
        let adapter = ScriptedAdapter::new(Source::Ms, &["A", "X"]);
        let coordinator = Coordinator::new(&config, vec![Box::new(adapter)], store).unwrap();

        let mut marks = coordinator.load_watermarks().await;
        assert!(marks.is_empty());

        let report = coordinator.run_pass(&mut marks).await;
        assert_eq!(ids(&report.new_records), vec!["A", "X"]);
        assert!(!report.sources[0].caught_up);
        // merged against an empty set
        assert!(report.persisted);
        assert_eq!(ids(&coordinator.store().snapshot()), vec!["A", "X"]);
        assert_eq!(marks[&Source::Ms], "A");
    }

    #[tokio::test]
    async fn test_corrupt_json_store_is_replaced() {
        let config = config();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scraped_articles.json");
        std::fs::write(&path, "[{ not json").unwrap();

        let adapter = ScriptedAdapter::new(Source::Edu, &["edu_0"]);
        let coordinator = Coordinator::new(&config, vec![Box::new(adapter)], JsonStore::new(&path)).unwrap();

        let mut marks = coordinator.load_watermarks().await;
        assert!(marks.is_empty());
        let report = coordinator.run_pass(&mut marks).await;
        assert!(report.persisted);

        let stored: Vec<Record> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(ids(&stored), vec!["edu_0"]);
    }

    #[test]
    fn test_watermarks_from_takes_first_per_source() {
        let records = vec![
            sample_record(Source::Gov, "sed_04_Iun"),
            sample_record(Source::Ms, "ms_0_2025-06-04"),
            sample_record(Source::Gov, "sed_28_Mai"),
        ];
        let marks = watermarks_from(&records);
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[&Source::Gov], "sed_04_Iun");
        assert_eq!(marks[&Source::Ms], "ms_0_2025-06-04");
    }
}
