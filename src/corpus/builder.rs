//! Expansion of a category schema into a labelled training corpus.
//!
//! Per category, in order: every keyword, then each keyword's variations
//! (the keyword itself, question templates, synonyms; at most five), then up
//! to three usable sentences from each canned response. Output depends only
//! on the schema and the synonym table.

use std::sync::OnceLock;

use regex::Regex;

use super::example::{ExampleSource, TrainingExample};
use super::schema::CategorySchema;

/// Maximum variations generated per keyword, the keyword itself included.
pub const MAX_VARIATIONS: usize = 5;
/// Sentences taken from each response.
pub const MAX_RESPONSE_PHRASES: usize = 3;
/// Accepted phrase length in characters, `[min, max)`.
pub const PHRASE_LEN_RANGE: (usize, usize) = (10, 100);

const QUESTION_TEMPLATES: &[&str] = &[
    "what is {}",
    "how does {} work",
    "tell me about {}",
    "explain {}",
    "information about {}",
];

const INTERROGATIVES: &[&str] = &["what", "how", "why", "when", "where"];

fn default_synonyms() -> Vec<(String, Vec<String>)> {
    let table: &[(&str, &[&str])] = &[
        ("ai", &["artificial intelligence", "machine intelligence"]),
        ("ml", &["machine learning"]),
        ("software", &["programming", "coding", "development"]),
        ("mobile", &["mobile app", "mobile development", "smartphone app"]),
        ("web", &["website", "web development", "web application"]),
        ("cloud", &["cloud computing", "cloud services", "cloud platform"]),
        ("security", &["cybersecurity", "cyber security", "information security"]),
    ];
    table
        .iter()
        .map(|(term, synonyms)| {
            (
                (*term).to_string(),
                synonyms.iter().map(|s| (*s).to_string()).collect(),
            )
        })
        .collect()
}

fn sentence_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| {
        Regex::new(r"[.!?]+(?:\s+|$)|\n+").expect("sentence boundary regex must compile")
    })
}

/// Expands schemas into training corpora.
#[derive(Debug, Clone)]
pub struct CorpusBuilder {
    synonyms: Vec<(String, Vec<String>)>,
}

impl Default for CorpusBuilder {
    fn default() -> Self {
        Self {
            synonyms: default_synonyms(),
        }
    }
}

impl CorpusBuilder {
    /// Use a custom synonym table. Entries are consulted in order.
    pub fn with_synonyms(synonyms: Vec<(String, Vec<String>)>) -> Self {
        Self { synonyms }
    }

    /// Build the corpus. An empty schema yields an empty corpus.
    pub fn build(&self, schema: &CategorySchema) -> Vec<TrainingExample> {
        let mut corpus = Vec::new();
        for (category, spec) in schema.iter() {
            for keyword in &spec.keywords {
                corpus.push(
                    TrainingExample::synthetic(keyword.as_str(), category, ExampleSource::Keyword)
                        .with_annotation(keyword.as_str()),
                );
                for variation in self.keyword_variations(keyword) {
                    corpus.push(
                        TrainingExample::synthetic(variation, category, ExampleSource::Variation)
                            .with_annotation(keyword.as_str()),
                    );
                }
            }
            for response in &spec.responses {
                for phrase in response_phrases(response) {
                    corpus.push(TrainingExample::synthetic(
                        phrase,
                        category,
                        ExampleSource::Response,
                    ));
                }
            }
        }
        tracing::debug!(
            categories = schema.len(),
            examples = corpus.len(),
            "Built synthetic corpus"
        );
        corpus
    }

    /// Variations for one keyword, starting with the keyword itself.
    pub fn keyword_variations(&self, keyword: &str) -> Vec<String> {
        let lowered = keyword.to_lowercase();
        let mut variations = vec![keyword.to_string()];
        let starts_with_question = INTERROGATIVES
            .iter()
            .any(|word| lowered.starts_with(word));
        if !starts_with_question {
            variations.extend(
                QUESTION_TEMPLATES
                    .iter()
                    .map(|template| template.replace("{}", keyword)),
            );
        }
        let words: Vec<&str> = lowered.split_whitespace().collect();
        for (term, synonyms) in &self.synonyms {
            if words.contains(&term.as_str()) {
                variations.extend(synonyms.iter().cloned());
            }
        }
        variations.truncate(MAX_VARIATIONS);
        variations
    }
}

/// First sentences of a response whose trimmed length falls in
/// [`PHRASE_LEN_RANGE`].
pub fn response_phrases(response: &str) -> Vec<String> {
    let (min, max) = PHRASE_LEN_RANGE;
    sentence_boundary()
        .split(response)
        .map(str::trim)
        .filter(|sentence| {
            let len = sentence.chars().count();
            len >= min && len < max
        })
        .take(MAX_RESPONSE_PHRASES)
        .map(str::to_string)
        .collect()
}
