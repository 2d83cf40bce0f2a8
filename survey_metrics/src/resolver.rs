//! Finding the column that holds the answers to a known question.
//!
//! Survey exports are edited by hand: the same question may appear with
//! different wordings from one edition to the next. A [ColumnSpec] lists the
//! wordings known in advance, and some keyword rules to catch the others.

use log::debug;

/// A conjunction of substrings that must all be present in a header.
/// Matching is case-insensitive and does not tokenize the header.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct KeywordRule {
    required: Vec<String>,
}

impl KeywordRule {
    pub fn all_of(words: &[&str]) -> KeywordRule {
        KeywordRule {
            required: words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn matches(&self, header: &str) -> bool {
        let lower = header.to_lowercase();
        !self.required.is_empty() && self.required.iter().all(|w| lower.contains(w.as_str()))
    }
}

/// How to find the column for one logical metric.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ColumnSpec {
    /// Literal headers, in priority order.
    pub candidates: Vec<String>,
    /// Fallback rules, in priority order. Only used when no literal header matches.
    pub keywords: Vec<KeywordRule>,
}

impl ColumnSpec {
    pub fn exact(candidates: &[&str]) -> ColumnSpec {
        ColumnSpec {
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(mut self, rules: Vec<KeywordRule>) -> ColumnSpec {
        self.keywords = rules;
        self
    }
}

/// Maps a [ColumnSpec] to at most one column of a table.
///
/// Not finding a column is not an error: the metric is simply not available
/// for this dataset.
pub trait ColumnResolver {
    fn resolve<'a>(&self, spec: &ColumnSpec, headers: &[&'a str]) -> Option<&'a str>;
}

/// Literal headers only. Suited to data whose schema is known, such as the
/// responses stored by the collector.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct ExactResolver;

/// Literal headers first, then the keyword rules.
///
/// The keyword rules are tried in their declared order, and for each rule the
/// headers are scanned in table order: when two headers match different
/// rules, the header matching the first-declared rule wins, whatever its
/// position in the table.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct HeuristicResolver;

impl ColumnResolver for ExactResolver {
    fn resolve<'a>(&self, spec: &ColumnSpec, headers: &[&'a str]) -> Option<&'a str> {
        find_exact(spec, headers)
    }
}

impl ColumnResolver for HeuristicResolver {
    fn resolve<'a>(&self, spec: &ColumnSpec, headers: &[&'a str]) -> Option<&'a str> {
        find_exact(spec, headers).or_else(|| find_keyword(spec, headers))
    }
}

fn find_exact<'a>(spec: &ColumnSpec, headers: &[&'a str]) -> Option<&'a str> {
    spec.candidates
        .iter()
        .find_map(|cand| headers.iter().find(|h| **h == cand.as_str()).copied())
}

fn find_keyword<'a>(spec: &ColumnSpec, headers: &[&'a str]) -> Option<&'a str> {
    for rule in spec.keywords.iter() {
        if let Some(h) = headers.iter().find(|h| rule.matches(h)) {
            debug!("find_keyword: rule {:?} matched column {:?}", rule, h);
            return Some(*h);
        }
    }
    None
}
