//! Descriptive features reported alongside each prediction.
//!
//! These are diagnostics only. The classifier is trained on normalized text
//! and never sees this record.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::sentiment;

/// Technology vocabulary flagged in every [`FeatureSet`].
pub const TECH_KEYWORDS: &[&str] = &[
    "ai",
    "machine learning",
    "software",
    "development",
    "mobile",
    "web",
    "cloud",
    "cybersecurity",
    "programming",
    "coding",
    "react",
    "python",
    "javascript",
    "java",
    "database",
    "api",
    "frontend",
    "backend",
];

/// Business vocabulary flagged in every [`FeatureSet`].
pub const BUSINESS_KEYWORDS: &[&str] = &[
    "price",
    "cost",
    "service",
    "company",
    "contact",
    "project",
    "consultation",
    "team",
    "solution",
    "help",
    "support",
    "meeting",
    "schedule",
];

/// Fixed-shape diagnostic record for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub char_count: usize,
    pub word_count: usize,
    /// In `[-1, 1]`.
    pub sentiment_polarity: f32,
    /// In `[0, 1]`.
    pub sentiment_subjectivity: f32,
    pub is_question: bool,
    pub has_what: bool,
    pub has_how: bool,
    pub has_why: bool,
    pub has_when: bool,
    pub has_where: bool,
    /// One entry per [`TECH_KEYWORDS`] item.
    pub tech_keywords: BTreeMap<String, bool>,
    /// One entry per [`BUSINESS_KEYWORDS`] item.
    pub business_keywords: BTreeMap<String, bool>,
}

struct KeywordMatcher {
    keyword: &'static str,
    regex: Regex,
}

fn matchers(
    keywords: &'static [&'static str],
    cell: &'static OnceLock<Vec<KeywordMatcher>>,
) -> &'static [KeywordMatcher] {
    cell.get_or_init(|| {
        keywords
            .iter()
            .map(|&keyword| KeywordMatcher {
                keyword,
                regex: Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword)))
                    .expect("keyword regex must compile"),
            })
            .collect()
    })
}

fn tech_matchers() -> &'static [KeywordMatcher] {
    static CELL: OnceLock<Vec<KeywordMatcher>> = OnceLock::new();
    matchers(TECH_KEYWORDS, &CELL)
}

fn business_matchers() -> &'static [KeywordMatcher] {
    static CELL: OnceLock<Vec<KeywordMatcher>> = OnceLock::new();
    matchers(BUSINESS_KEYWORDS, &CELL)
}

fn flags(matchers: &[KeywordMatcher], text: &str) -> BTreeMap<String, bool> {
    matchers
        .iter()
        .map(|m| (m.keyword.to_string(), m.regex.is_match(text)))
        .collect()
}

/// Compute the descriptive features of the raw (un-normalized) text.
pub fn extract_features(text: &str) -> FeatureSet {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    let has_word = |needle: &str| words.iter().any(|word| *word == needle);
    let sentiment = sentiment::analyze(text);
    FeatureSet {
        char_count: text.chars().count(),
        word_count: text.split_whitespace().count(),
        sentiment_polarity: sentiment.polarity,
        sentiment_subjectivity: sentiment.subjectivity,
        is_question: text.contains('?'),
        has_what: has_word("what"),
        has_how: has_word("how"),
        has_why: has_word("why"),
        has_when: has_word("when"),
        has_where: has_word("where"),
        tech_keywords: flags(tech_matchers(), &lowered),
        business_keywords: flags(business_matchers(), &lowered),
    }
}
