//! Configuration for sources, taxonomy, point extraction and simplification.
//!
//! The default configuration lives in `config/default.yaml` and is embedded in
//! the binary. A different file can be supplied with `--config`; it replaces
//! the defaults entirely. The configuration is treated as immutable data and
//! handed by reference to every component.

use crate::errors::{IngestError, Result};
use crate::models::Source;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};

const DEFAULT_CONFIG: &str = include_str!("../config/default.yaml");

/// Key of the sentinel category returned when no keyword matches.
pub const GENERAL_CATEGORY: &str = "general";

/// Root of the configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub pipeline: PipelineConfig,
    pub structured: StructuredConfig,
    /// Declaration order is the classifier's fallback order.
    pub taxonomy: Vec<CategoryConfig>,
    pub simplifier: SimplifierConfig,
    pub sources: Vec<SourceConfig>,
    /// Legal terms explained to readers; used by store searches.
    #[serde(default)]
    pub glossary: Vec<LegalTerm>,
}

/// Outbound request settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Maximum number of characters kept in `rawContent`.
    pub max_content_length: usize,
    pub truncation_marker: String,
    /// Pause between two sources.
    pub source_delay_ms: u64,
    /// Lines shorter than this are ignored by the generic point strategy.
    pub min_line_length: usize,
    pub max_points: usize,
    /// Cap used when the structured strategy falls back to the generic one.
    pub fallback_max_points: usize,
}

/// Settings of the section-based point strategy used for the government site.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StructuredConfig {
    pub description_selector: String,
    pub fallback_selectors: Vec<String>,
    /// Lowercase prefixes that open a new section.
    pub section_markers: Vec<String>,
    pub min_section_length: usize,
    /// Checked in order; the first rule with a matching keyword wins.
    pub topic_rules: Vec<PointRule>,
    pub decision_verbs: Vec<String>,
    pub decision_fallback: String,
    pub discussed_fallback: String,
}

/// Keyword list mapped to a canned child-friendly statement.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PointRule {
    pub keywords: Vec<String>,
    pub point: String,
}

impl PointRule {
    /// `text` must already be lowercase.
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// One taxonomy entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryConfig {
    pub key: String,
    pub label: String,
    pub emoji: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

/// A legal term and its plain-language explanation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LegalTerm {
    pub term: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimplifierConfig {
    /// Applied in order, each on the output of the previous one.
    pub replacements: Vec<Replacement>,
    /// Closing sentence per category key.
    pub endings: HashMap<String, String>,
    pub default_ending: String,
}

/// How a source's listing page is turned into candidates.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListingConfig {
    /// Container elements identified by class whose id carries the item
    /// token; anchors are kept when their text contains `marker`.
    Meetings {
        container_selector: String,
        link_selector: String,
        id_prefix: String,
        marker: String,
    },
    /// First `max_items` elements matching `item_selector`.
    Generic {
        item_selector: String,
        title_selector: String,
        #[serde(default)]
        date_selector: Option<String>,
        #[serde(default = "default_max_items")]
        max_items: usize,
    },
}

fn default_max_items() -> usize {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    Structured,
    Generic,
}

/// Everything the pipeline knows about one site.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub key: Source,
    pub name: String,
    pub base_url: String,
    pub listing_url: String,
    pub listing: ListingConfig,
    /// Tried in order when extracting article text.
    pub content_selectors: Vec<String>,
    #[serde(default)]
    pub preferred_categories: Vec<String>,
    pub extraction: ExtractionStrategy,
    #[serde(default)]
    pub point_rules: Vec<PointRule>,
    pub default_points: Vec<String>,
}

impl AppConfig {
    /// Parse and validate the embedded default configuration.
    pub fn embedded() -> Result<Self> {
        Self::from_yaml(DEFAULT_CONFIG)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or the embedded defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self> {
        let config = match path {
            Some(p) => {
                let yaml = tokio::fs::read_to_string(p)
                    .await
                    .map_err(|e| IngestError::Config(format!("cannot read {p}: {e}")))?;
                Self::from_yaml(&yaml)?
            }
            None => Self::embedded()?,
        };
        info!(
            sources = config.sources.len(),
            categories = config.taxonomy.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(IngestError::Config("no sources configured".into()));
        }
        if self.pipeline.max_content_length == 0 {
            return Err(IngestError::Config("max_content_length must be positive".into()));
        }
        if self.pipeline.max_points == 0 || self.pipeline.fallback_max_points == 0 {
            return Err(IngestError::Config("point caps must be positive".into()));
        }

        let mut categories = HashSet::new();
        for category in &self.taxonomy {
            if !categories.insert(category.key.as_str()) {
                return Err(IngestError::Config(format!(
                    "category '{}' declared twice",
                    category.key
                )));
            }
        }
        match self.category(GENERAL_CATEGORY) {
            None => {
                return Err(IngestError::Config(format!(
                    "taxonomy must declare a '{GENERAL_CATEGORY}' category"
                )));
            }
            Some(general) if !general.keywords.is_empty() => {
                return Err(IngestError::Config(format!(
                    "'{GENERAL_CATEGORY}' category must not have keywords"
                )));
            }
            Some(_) => {}
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.key) {
                return Err(IngestError::Config(format!(
                    "source '{}' declared twice",
                    source.key
                )));
            }
            if source.content_selectors.is_empty() {
                return Err(IngestError::Config(format!(
                    "source '{}' has no content selectors",
                    source.key
                )));
            }
            if source.default_points.is_empty() {
                return Err(IngestError::Config(format!(
                    "source '{}' has no default points",
                    source.key
                )));
            }
            if let Some(unknown) = source
                .preferred_categories
                .iter()
                .find(|k| !categories.contains(k.as_str()))
            {
                return Err(IngestError::Config(format!(
                    "source '{}' prefers unknown category '{unknown}'",
                    source.key
                )));
            }
            url::Url::parse(&source.base_url).map_err(|e| {
                IngestError::Config(format!("source '{}' base_url: {e}", source.key))
            })?;
        }
        if let Some(entry) = self
            .glossary
            .iter()
            .find(|t| t.term.trim().is_empty() || t.explanation.trim().is_empty())
        {
            return Err(IngestError::Config(format!(
                "glossary entry '{}' needs a term and an explanation",
                entry.term
            )));
        }
        Ok(())
    }

    pub fn category(&self, key: &str) -> Option<&CategoryConfig> {
        self.taxonomy.iter().find(|c| c.key == key)
    }

    pub fn source(&self, key: Source) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_is_valid() {
        let config = AppConfig::embedded().unwrap();
        assert_eq!(config.sources.len(), 5);
        assert_eq!(config.sources[0].key, Source::Gov);
        assert_eq!(config.pipeline.max_content_length, 1000);
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.category(GENERAL_CATEGORY).unwrap().keywords.is_empty());
    }

    #[test]
    fn test_taxonomy_order_preserved() {
        let config = AppConfig::embedded().unwrap();
        let keys: Vec<&str> = config.taxonomy.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys.first(), Some(&"infrastructure"));
        assert_eq!(keys.last(), Some(&GENERAL_CATEGORY));
    }

    #[test]
    fn test_listing_kinds_deserialize() {
        let config = AppConfig::embedded().unwrap();
        let gov = config.source(Source::Gov).unwrap();
        assert!(matches!(gov.listing, ListingConfig::Meetings { .. }));
        assert_eq!(gov.extraction, ExtractionStrategy::Structured);

        let mt = config.source(Source::Mt).unwrap();
        match &mt.listing {
            ListingConfig::Generic {
                date_selector,
                max_items,
                ..
            } => {
                assert!(date_selector.is_none());
                assert_eq!(*max_items, 10);
            }
            other => panic!("unexpected listing: {other:?}"),
        }
    }

    #[test]
    fn test_glossary_loaded_and_validated() {
        let mut config = AppConfig::embedded().unwrap();
        assert_eq!(config.glossary.len(), 8);
        assert_eq!(config.glossary[0].term, "hotărâre de guvern");

        config.glossary[1].explanation = " ".into();
        assert!(config.validate().unwrap_err().is_fatal());
    }

    #[test]
    fn test_missing_general_rejected() {
        let mut config = AppConfig::embedded().unwrap();
        config.taxonomy.retain(|c| c.key != GENERAL_CATEGORY);
        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("general"));
    }

    #[test]
    fn test_unknown_preferred_category_rejected() {
        let mut config = AppConfig::embedded().unwrap();
        config.sources[1].preferred_categories.push("sports".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sports"));
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let mut config = AppConfig::embedded().unwrap();
        let dup = config.sources[0].clone();
        config.sources.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_source_key_is_yaml_error() {
        let yaml = DEFAULT_CONFIG.replace("key: mt", "key: bbc");
        let err = AppConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, IngestError::Yaml(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_point_rule_matches_lowercase_text() {
        let rule = PointRule {
            keywords: vec!["vaccin".into(), "spital".into()],
            point: "p".into(),
        };
        assert!(rule.matches("campania de vaccinare"));
        assert!(!rule.matches("școala se deschide"));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_config_error() {
        let err = AppConfig::load(Some("/nonexistent/gov_kids_news.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }
}
