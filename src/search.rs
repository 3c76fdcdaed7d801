//! Queries over the stored record set.
//!
//! Readers look articles up by free text, by document type (`hotărâre`,
//! `ordonanță`, ...) and by subject. Every comparison ignores case and
//! diacritics, so `scoala` finds `Școala` and `ordonanta` finds `ORDONANŢĂ`.
//!
//! The [`Glossary`] finds the legal terms an article mentions so they can be
//! explained next to it.

use crate::config::LegalTerm;
use crate::models::Record;
use itertools::Itertools;
use serde::Serialize;

/// Strip the diacritics found in Romanian text and common loanwords.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(remove_diacritics("Școală și țară"), "Scoala si tara");
/// ```
pub fn remove_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ă' | 'â' | 'á' | 'à' => 'a',
            'î' | 'í' | 'ì' => 'i',
            'ș' | 'ş' | 'ś' => 's',
            'ț' | 'ţ' | 'ť' => 't',
            'ó' | 'ò' | 'ô' => 'o',
            'é' | 'è' | 'ê' => 'e',
            'ú' | 'ù' | 'û' => 'u',
            'ń' | 'ň' => 'n',
            'ć' | 'č' => 'c',
            'ř' => 'r',
            'ď' => 'd',
            'ľ' => 'l',
            'ž' => 'z',
            'Ă' | 'Â' | 'Á' | 'À' => 'A',
            'Î' | 'Í' | 'Ì' => 'I',
            'Ș' | 'Ş' | 'Ś' => 'S',
            'Ț' | 'Ţ' | 'Ť' => 'T',
            'Ó' | 'Ò' | 'Ô' => 'O',
            'É' | 'È' | 'Ê' => 'E',
            'Ú' | 'Ù' | 'Û' => 'U',
            'Ń' | 'Ň' => 'N',
            'Ć' | 'Č' => 'C',
            'Ř' => 'R',
            'Ď' => 'D',
            'Ľ' => 'L',
            'Ž' => 'Z',
            other => other,
        })
        .collect()
}

/// Lowercased, diacritic-free form used for every comparison.
fn fold(text: &str) -> String {
    remove_diacritics(&text.to_lowercase())
}

/// Filter over stored records. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    term: Option<String>,
    document_type: Option<String>,
    subject: Option<String>,
}

impl ArticleQuery {
    /// Build a query; empty values and `all` leave a criterion unset.
    pub fn new(term: Option<&str>, document_type: Option<&str>, subject: Option<&str>) -> Self {
        Self {
            term: criterion(term, false),
            document_type: criterion(document_type, true),
            subject: criterion(subject, true),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.term.is_none() && self.document_type.is_none() && self.subject.is_none()
    }

    /// Whether `record` satisfies every set criterion.
    ///
    /// - term: title, raw or simplified text contains it
    /// - document type: title or raw text contains it
    /// - subject: the category key equals it, or title or raw text contains it
    pub fn matches(&self, record: &Record) -> bool {
        let title = fold(&record.title);
        let raw = fold(&record.raw_content);

        let term_ok = self.term.as_deref().is_none_or(|t| {
            title.contains(t) || raw.contains(t) || fold(&record.simplified_content).contains(t)
        });
        let type_ok = self
            .document_type
            .as_deref()
            .is_none_or(|t| title.contains(t) || raw.contains(t));
        let subject_ok = self
            .subject
            .as_deref()
            .is_none_or(|s| fold(&record.category) == s || title.contains(s) || raw.contains(s));

        term_ok && type_ok && subject_ok
    }
}

fn criterion(value: Option<&str>, allow_all: bool) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || (allow_all && value.eq_ignore_ascii_case("all")) {
        return None;
    }
    Some(fold(value))
}

/// Records matching `query`, in store order.
pub fn filter_records<'r>(records: &'r [Record], query: &ArticleQuery) -> Vec<&'r Record> {
    records.iter().filter(|r| query.matches(r)).collect()
}

/// Legal-term lookup built from the configured glossary.
#[derive(Debug)]
pub struct Glossary<'a> {
    /// Longest term first, with its folded form.
    terms: Vec<(&'a LegalTerm, String)>,
}

impl<'a> Glossary<'a> {
    pub fn new(terms: &'a [LegalTerm]) -> Self {
        Self {
            terms: terms
                .iter()
                .map(|t| (t, fold(&t.term)))
                .sorted_by_key(|(_, folded)| std::cmp::Reverse(folded.chars().count()))
                .collect(),
        }
    }

    /// Explanation of `term`, ignoring case and diacritics.
    pub fn explain(&self, term: &str) -> Option<&'a LegalTerm> {
        let wanted = fold(term.trim());
        self.terms
            .iter()
            .find(|(_, folded)| *folded == wanted)
            .map(|(t, _)| *t)
    }

    /// Terms mentioned in `text`, longest first.
    ///
    /// Text claimed by a longer term is not matched again by a shorter one, so
    /// `hotărâre de guvern` does not also report `hotărâre`.
    pub fn terms_in(&self, text: &str) -> Vec<&'a LegalTerm> {
        let mut remaining = fold(text);
        let mut found = Vec::new();
        for (term, folded) in &self.terms {
            if remaining.contains(folded.as_str()) {
                found.push(*term);
                remaining = remaining.replace(folded.as_str(), "\u{0}");
            }
        }
        found
    }
}

/// One search result as printed by the CLI.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit<'a> {
    #[serde(flatten)]
    pub record: &'a Record,
    pub legal_terms: Vec<&'a LegalTerm>,
}

/// Run `query` over `records` and attach the legal terms of each hit.
pub fn search<'a>(records: &'a [Record], query: &ArticleQuery, glossary: &Glossary<'a>) -> Vec<SearchHit<'a>> {
    filter_records(records, query)
        .into_iter()
        .map(|record| SearchHit {
            record,
            legal_terms: glossary.terms_in(&format!("{} {}", record.title, record.raw_content)),
        })
        .collect()
}
