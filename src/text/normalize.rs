//! Deterministic text normalization.
//!
//! Lowercase, drop non-alphabetic characters, split on whitespace, remove
//! stop words, then reduce each token (lemma, then Snowball stem) and re-join
//! with single spaces. Normalization never fails: if the input cannot be
//! tokenized the lowercased raw text is returned instead.

use std::sync::OnceLock;

use rust_stemmers::{Algorithm, Stemmer};

use super::lemma::lemmatize;
use super::stopwords::is_stop_word;

/// Inputs longer than this are not tokenized.
const MAX_TOKENIZE_CHARS: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
enum TokenizeError {
    #[error("input of {0} characters exceeds the tokenizer limit")]
    TooLong(usize),
}

fn stemmer() -> &'static Stemmer {
    static STEMMER: OnceLock<Stemmer> = OnceLock::new();
    STEMMER.get_or_init(|| Stemmer::create(Algorithm::English))
}

/// Normalize a string into the token form used by the classifier.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    match tokenize(&lowered) {
        Ok(tokens) => reduce(tokens),
        Err(err) => {
            tracing::debug!("Normalization fell back to raw text: {err}");
            lowered
        }
    }
}

fn tokenize(lowered: &str) -> Result<Vec<String>, TokenizeError> {
    let len = lowered.chars().count();
    if len > MAX_TOKENIZE_CHARS {
        return Err(TokenizeError::TooLong(len));
    }
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();
    Ok(cleaned.split_whitespace().map(str::to_string).collect())
}

fn reduce(tokens: Vec<String>) -> String {
    let stemmer = stemmer();
    tokens
        .into_iter()
        .filter(|token| !is_stop_word(token))
        .map(|token| stemmer.stem(&lemmatize(&token)).into_owned())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
