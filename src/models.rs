//! Data models shared across the pipeline.
//!
//! - [`Source`]: key of a configured government site
//! - [`CandidateItem`]: one entry discovered on a source's listing page
//! - [`Record`]: a fully processed article as persisted in the store
//!
//! Records serialize with camelCase field names, which is the layout the
//! front-end reads from `scraped_articles.json`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A configured government web site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Guvernul României (gov.ro), government meetings.
    Gov,
    /// Ministerul Afacerilor Interne.
    Mai,
    /// Ministerul Sănătății.
    Ms,
    /// Ministerul Educației.
    Edu,
    /// Ministerul Transporturilor și Infrastructurii.
    Mt,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Gov => "gov",
            Source::Mai => "mai",
            Source::Ms => "ms",
            Source::Edu => "edu",
            Source::Mt => "mt",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item found on a listing page, before its content is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    /// Site token, or a synthesized `{source}_{ordinal}_{date}` id.
    pub id: String,
    pub url: String,
    pub title: String,
    /// Date as the site displays it.
    pub date_label: String,
}

/// Result of the classifier: taxonomy key plus its display form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub key: String,
    pub emoji: String,
    pub label: String,
}

/// One processed article.
///
/// Records are created once by the coordinator and never mutated after they
/// have been persisted.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique within `source`.
    pub id: String,
    pub source: Source,
    /// Site-native date string; not normalized across sources.
    pub date: String,
    pub title: String,
    pub url: String,
    /// Extracted page text, capped at the configured maximum length.
    pub raw_content: String,
    pub category: String,
    pub category_label: String,
    pub category_emoji: String,
    /// Between one and six short child-friendly statements.
    pub points: Vec<String>,
    pub simplified_content: String,
    /// RFC 3339 processing timestamp.
    pub scraped_at: String,
    #[serde(default)]
    pub is_new: bool,
}

#[cfg(test)]
pub(crate) fn sample_record(source: Source, id: &str) -> Record {
    Record {
        id: id.to_string(),
        source,
        date: "04_Iun".to_string(),
        title: format!("Articol {id}"),
        url: format!("https://gov.ro/{id}"),
        raw_content: "Conținut".to_string(),
        category: "general".to_string(),
        category_label: "General".to_string(),
        category_emoji: "📰".to_string(),
        points: vec!["Un lucru important".to_string()],
        simplified_content: "Conținut".to_string(),
        scraped_at: "2025-06-04T09:00:00+03:00".to_string(),
        is_new: true,
    }
}
