//! Structured point extraction.
//!
//! Turns article text into a short list of child-friendly statements. Two
//! strategies exist:
//!
//! - **Structured** (government meetings): the description container of the
//!   page is split into sections, one per adopted act. Each section is
//!   reduced to a canned statement by the configured topic rules.
//! - **Generic** (ministries): every long line of the page is matched against
//!   the source's own keyword rules.
//!
//! Both are pure functions of their input. When nothing matches, the source's
//! default points are used so the result is never empty.

use crate::config::{AppConfig, ExtractionStrategy, PointRule, SourceConfig};
use crate::errors::{IngestError, Result};
use crate::models::Source;
use crate::utils::fold_cedillas;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

/// `1.`, `12.` and so on at the start of a line.
static NUMBERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.").unwrap());

const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

#[derive(Debug)]
pub struct PointExtractor<'a> {
    config: &'a AppConfig,
    description: Selector,
    fallbacks: Vec<Selector>,
}

impl<'a> PointExtractor<'a> {
    pub fn new(config: &'a AppConfig) -> Result<Self> {
        let structured = &config.structured;
        Ok(Self {
            config,
            description: parse_selector(&structured.description_selector)?,
            fallbacks: structured
                .fallback_selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    /// Produce between one and `max_points` statements for an article.
    pub fn extract_points(&self, content: &str, document: Option<&Html>, source: Source) -> Vec<String> {
        let Some(source_config) = self.config.source(source) else {
            return vec![self.config.structured.discussed_fallback.clone()];
        };
        let pipeline = &self.config.pipeline;

        let (points, cap) = match (source_config.extraction, document) {
            (ExtractionStrategy::Structured, Some(doc)) => match self.structured_points(doc) {
                Some(points) => (points, pipeline.max_points),
                None => {
                    debug!(%source, "No description container; using line rules");
                    (
                        self.generic_points(content, Some(doc), source_config),
                        pipeline.fallback_max_points,
                    )
                }
            },
            _ => (
                self.generic_points(content, document, source_config),
                pipeline.max_points,
            ),
        };

        let points: Vec<String> = points.into_iter().unique().take(cap).collect();
        if points.is_empty() {
            debug!(%source, "No rule matched; using default points");
            return source_config
                .default_points
                .iter()
                .take(cap)
                .cloned()
                .collect();
        }
        points
    }

    /// Section-based reduction of the description container.
    ///
    /// Returns `None` when neither the description nor any fallback container
    /// exists on the page.
    fn structured_points(&self, doc: &Html) -> Option<Vec<String>> {
        let container = doc
            .select(&self.description)
            .next()
            .or_else(|| self.fallbacks.iter().find_map(|s| doc.select(s).next()))?;

        let lines = element_lines(container);
        let points = self
            .split_sections(&lines)
            .into_iter()
            .filter(|s| s.chars().count() >= self.config.structured.min_section_length)
            .map(|s| self.reduce_section(&s))
            .collect();
        Some(points)
    }

    fn starts_section(&self, line: &str) -> bool {
        let lowered = fold_cedillas(&line.to_lowercase());
        NUMBERED_ITEM.is_match(line)
            || self
                .config
                .structured
                .section_markers
                .iter()
                .any(|m| lowered.starts_with(m.as_str()))
    }

    /// Group lines into sections. Lines before the first marker are dropped.
    fn split_sections(&self, lines: &[String]) -> Vec<String> {
        let mut sections = Vec::new();
        let mut current: Option<String> = None;

        for line in lines {
            if self.starts_section(line) {
                if let Some(done) = current.take() {
                    sections.push(done);
                }
                current = Some(line.clone());
            } else if let Some(section) = current.as_mut() {
                section.push(' ');
                section.push_str(line);
            }
        }
        sections.extend(current);
        sections
    }

    fn reduce_section(&self, section: &str) -> String {
        let structured = &self.config.structured;
        let lowered = fold_cedillas(&section.to_lowercase());
        if let Some(rule) = structured.topic_rules.iter().find(|r| r.matches(&lowered)) {
            return rule.point.clone();
        }
        if structured
            .decision_verbs
            .iter()
            .any(|v| lowered.contains(v.as_str()))
        {
            structured.decision_fallback.clone()
        } else {
            structured.discussed_fallback.clone()
        }
    }

    /// Match every sufficiently long line against the source's rules.
    fn generic_points(&self, content: &str, document: Option<&Html>, source: &SourceConfig) -> Vec<String> {
        let lines = match document {
            Some(doc) => element_lines(doc.root_element()),
            None => content_lines(content),
        };
        lines
            .iter()
            .filter(|l| l.chars().count() > self.config.pipeline.min_line_length)
            .filter_map(|l| first_match(&source.point_rules, &fold_cedillas(&l.to_lowercase())))
            .collect()
    }
}

fn first_match(rules: &[PointRule], lowered: &str) -> Option<String> {
    rules.iter().find(|r| r.matches(lowered)).map(|r| r.point.clone())
}

pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| IngestError::Config(format!("invalid selector '{s}': {e}")))
}

/// Visible text of an element split into trimmed, non-empty lines.
///
/// Text nodes are concatenated as they appear, so inline markup inside a
/// paragraph does not break it; only newlines in the text separate lines.
fn element_lines(element: ElementRef<'_>) -> Vec<String> {
    let text: String = element
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|p| p.value().as_element().map(|e| e.name()))
                    .is_some_and(|name| SKIPPED_ELEMENTS.contains(&name));
                (!hidden).then_some(&text.text[..])
            }
            _ => None,
        })
        .collect();

    text.split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Plain-text fallback when no parsed page is available.
fn content_lines(content: &str) -> Vec<String> {
    content
        .split_inclusive(['\n', '.', '!', '?'])
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
