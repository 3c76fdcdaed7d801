//! Whole-document lexical simplification.

use crate::config::SimplifierConfig;
use crate::utils::upcase;

/// Rewrites text with the configured word replacements and a closing remark.
#[derive(Debug, Clone, Copy)]
pub struct Simplifier<'a> {
    config: &'a SimplifierConfig,
}

impl<'a> Simplifier<'a> {
    pub fn new(config: &'a SimplifierConfig) -> Self {
        Self { config }
    }

    /// Lowercase `text`, apply every replacement in order, append the closing
    /// sentence for `category` and capitalize the first letter.
    ///
    /// Empty input yields empty output.
    pub fn simplify(&self, text: &str, category: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let mut simplified = text.to_lowercase();
        for r in &self.config.replacements {
            simplified = simplified.replace(&r.from, &r.to);
        }

        let ending = self
            .config
            .endings
            .get(category)
            .unwrap_or(&self.config.default_ending);
        simplified.push_str(ending);

        upcase(&simplified)
    }
}
