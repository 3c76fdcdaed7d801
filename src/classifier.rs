//! Keyword-based content classification.
//!
//! The source's preferred categories are checked first, in the configured
//! order, followed by the rest of the taxonomy in declaration order. The first
//! category with a keyword contained in the lowercased text wins; there is no
//! scoring. Text matching nothing lands in the `general` category.

use crate::config::{AppConfig, CategoryConfig, GENERAL_CATEGORY};
use crate::models::{Classification, Source};
use tracing::debug;

/// Maps article text to one taxonomy category.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    config: &'a AppConfig,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    /// Categories in the order they are checked for `source`.
    fn search_order(&self, source: Source) -> Vec<&'a CategoryConfig> {
        let preferred: &[String] = self
            .config
            .source(source)
            .map(|s| s.preferred_categories.as_slice())
            .unwrap_or(&[]);

        let mut order: Vec<&CategoryConfig> = preferred
            .iter()
            .filter(|k| k.as_str() != GENERAL_CATEGORY)
            .filter_map(|k| self.config.category(k))
            .collect();
        order.extend(
            self.config
                .taxonomy
                .iter()
                .filter(|c| c.key != GENERAL_CATEGORY && !preferred.contains(&c.key)),
        );
        order
    }

    pub fn classify(&self, text: &str, source: Source) -> Classification {
        let lowered = text.to_lowercase();
        let hit = self.search_order(source).into_iter().find(|category| {
            category
                .keywords
                .iter()
                .any(|keyword| lowered.contains(keyword.as_str()))
        });

        match hit {
            Some(category) => {
                debug!(%source, category = %category.key, "Classified article");
                to_classification(category)
            }
            None => {
                debug!(%source, "No category keyword matched");
                self.general()
            }
        }
    }

    fn general(&self) -> Classification {
        match self.config.category(GENERAL_CATEGORY) {
            Some(category) => to_classification(category),
            // validate() guarantees the entry exists; keep the key valid regardless
            None => Classification {
                key: GENERAL_CATEGORY.to_string(),
                emoji: "📰".to_string(),
                label: "General".to_string(),
            },
        }
    }
}

fn to_classification(category: &CategoryConfig) -> Classification {
    Classification {
        key: category.key.clone(),
        emoji: category.emoji.clone(),
        label: category.label.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig::embedded().unwrap()
    }

    #[test]
    fn test_preferred_category_wins_over_earlier_text_keywords() {
        let config = config();
        let classifier = Classifier::new(&config);
        let c = classifier.classify("au alocat 5 milioane lei pentru autostrăzi", Source::Mt);
        assert_eq!(c.key, "infrastructure");
        assert_eq!(c.label, "Infrastructură");
    }

    #[test]
    fn test_preference_order_is_load_bearing() {
        let config = config();
        let classifier = Classifier::new(&config);
        // gov prefers budget before infrastructure
        let c = classifier.classify("au alocat 5 milioane lei pentru autostrăzi", Source::Gov);
        assert_eq!(c.key, "budget");
    }

    #[test]
    fn test_preferred_beats_non_preferred_regardless_of_position() {
        let config = config();
        let classifier = Classifier::new(&config);
        // "poliția" is security (mai preferred), "spital" is health (not preferred)
        let c = classifier.classify("La spital a venit poliția", Source::Mai);
        assert_eq!(c.key, "security");
    }

    #[test]
    fn test_falls_back_to_taxonomy_order() {
        let config = config();
        let classifier = Classifier::new(&config);
        // edu prefers education/social; neither matches, so taxonomy order applies
        let c = classifier.classify("Noi investiții în energie regenerabilă", Source::Edu);
        assert_eq!(c.key, "energy");
        assert_eq!(c.emoji, "⚡");
    }

    #[test]
    fn test_no_match_is_general() {
        let config = config();
        let classifier = Classifier::new(&config);
        let c = classifier.classify("Vremea a fost frumoasă azi", Source::Ms);
        assert_eq!(c.key, GENERAL_CATEGORY);
        assert_eq!(c.emoji, "📰");
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let config = config();
        let classifier = Classifier::new(&config);
        let c = classifier.classify("SPITALUL JUDEȚEAN", Source::Ms);
        assert_eq!(c.key, "health");
    }

    #[test]
    fn test_classification_is_deterministic() {
        let config = config();
        let classifier = Classifier::new(&config);
        let text = "Ministerul a anunțat burse pentru elevi și fonduri europene";
        let first = classifier.classify(text, Source::Edu);
        for _ in 0..5 {
            assert_eq!(classifier.classify(text, Source::Edu), first);
        }
    }
}
