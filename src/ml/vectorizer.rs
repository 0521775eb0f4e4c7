//! TF-IDF bag-of-n-grams vectorizer.
//!
//! Tokens are the space-separated words of normalized text. Terms are word
//! n-grams up to `ngram_max`. Document frequency bounds and a vocabulary cap
//! are applied at fit time; vectors are L2-normalized TF * smoothed IDF.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::MlError;

/// Vectorizer hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerOptions {
    /// Largest n-gram length (1 = unigrams only).
    pub ngram_max: usize,
    /// Vocabulary cap, keeping the most frequent terms.
    pub max_features: usize,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Maximum share of documents a term may appear in, `(0, 1]`.
    pub max_df: f32,
}

impl Default for VectorizerOptions {
    fn default() -> Self {
        Self {
            ngram_max: 2,
            max_features: 5000,
            min_df: 1,
            max_df: 1.0,
        }
    }
}

/// Sparse feature vector with strictly increasing indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    /// Build from `(index, value)` pairs in any order; zero values are dropped.
    pub fn from_pairs(mut pairs: Vec<(u32, f32)>) -> Self {
        pairs.sort_by_key(|(idx, _)| *idx);
        pairs.dedup_by_key(|(idx, _)| *idx);
        let (indices, values) = pairs.into_iter().filter(|(_, v)| *v != 0.0).unzip();
        Self { indices, values }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Value at `index`, zero when absent.
    pub fn get(&self, index: u32) -> f32 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices
            .iter()
            .zip(self.values.iter())
            .map(|(&idx, &v)| (idx as usize, v))
    }

    /// Dot product with a dense row.
    pub fn dot(&self, dense: &[f32]) -> f32 {
        self.iter()
            .map(|(idx, v)| dense.get(idx).copied().unwrap_or(0.0) * v)
            .sum()
    }
}

/// Fitted vocabulary and IDF weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    pub options: VectorizerOptions,
    /// Term to column index; columns are assigned in lexical term order.
    pub vocabulary: BTreeMap<String, u32>,
    /// Indexed by column.
    pub idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Learn vocabulary and IDF weights from normalized documents.
    pub fn fit(documents: &[&str], options: &VectorizerOptions) -> Result<Self, MlError> {
        if documents.is_empty() {
            return Err(MlError::EmptyDataset);
        }
        let n_docs = documents.len();
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        let mut term_freq: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            let terms = terms(doc, options.ngram_max);
            let unique: BTreeSet<&String> = terms.iter().collect();
            for term in unique {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            for term in terms {
                *term_freq.entry(term).or_insert(0) += 1;
            }
        }

        let max_df = if options.max_df >= 1.0 {
            n_docs
        } else {
            ((options.max_df.max(0.0) as f64) * n_docs as f64).floor() as usize
        };
        let mut kept: Vec<(&String, usize)> = doc_freq
            .iter()
            .filter(|&(_, &df)| df >= options.min_df.max(1) && df <= max_df)
            .map(|(term, _)| (term, term_freq.get(term).copied().unwrap_or(0)))
            .collect();
        if kept.len() > options.max_features {
            kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            kept.truncate(options.max_features);
        }
        if kept.is_empty() {
            return Err(MlError::EmptyVocabulary);
        }
        let selected: BTreeSet<&String> = kept.into_iter().map(|(term, _)| term).collect();

        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(selected.len());
        for (col, term) in selected.into_iter().enumerate() {
            let df = doc_freq[term] as f32;
            idf.push(((1.0 + n_docs as f32) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term.clone(), col as u32);
        }
        Ok(Self {
            options: options.clone(),
            vocabulary,
            idf,
        })
    }

    /// Number of columns.
    pub fn dim(&self) -> usize {
        self.idf.len()
    }

    /// Vectorize a normalized document. Unknown terms are ignored.
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: BTreeMap<u32, f32> = BTreeMap::new();
        for term in terms(document, self.options.ngram_max) {
            if let Some(&col) = self.vocabulary.get(&term) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }
        let mut pairs: Vec<(u32, f32)> = counts
            .into_iter()
            .map(|(col, tf)| (col, tf * self.idf[col as usize]))
            .collect();
        let norm = pairs.iter().map(|(_, v)| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for (_, v) in &mut pairs {
                *v /= norm;
            }
        }
        SparseVector::from_pairs(pairs)
    }

    /// Check that the fitted state is internally consistent.
    pub fn validate(&self) -> Result<(), MlError> {
        if self.vocabulary.len() != self.idf.len() {
            return Err(MlError::InvalidModel(format!(
                "vocabulary has {} terms but idf has {} weights",
                self.vocabulary.len(),
                self.idf.len()
            )));
        }
        if self
            .vocabulary
            .values()
            .any(|&col| col as usize >= self.idf.len())
        {
            return Err(MlError::InvalidModel("vocabulary column out of range".into()));
        }
        Ok(())
    }
}

fn terms(document: &str, ngram_max: usize) -> Vec<String> {
    let tokens: Vec<&str> = document.split_whitespace().collect();
    let mut out = Vec::new();
    for n in 1..=ngram_max.max(1) {
        if n > tokens.len() {
            break;
        }
        out.extend(tokens.windows(n).map(|window| window.join(" ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_include_bigrams() {
        assert_eq!(
            terms("cloud host plan", 2),
            vec!["cloud", "host", "plan", "cloud host", "host plan"]
        );
        assert_eq!(terms("cloud", 2), vec!["cloud"]);
        assert!(terms("", 2).is_empty());
    }

    #[test]
    fn vocabulary_is_lexical_and_vectors_are_unit_length() {
        let docs = ["price", "price work", "email"];
        let vectorizer = TfidfVectorizer::fit(&docs, &VectorizerOptions::default()).unwrap();
        let cols: Vec<&str> = vectorizer.vocabulary.keys().map(String::as_str).collect();
        assert_eq!(cols, vec!["email", "price", "price work", "work"]);
        assert_eq!(vectorizer.vocabulary["email"], 0);

        let v = vectorizer.transform("price work");
        assert_eq!(v.nnz(), 3);
        let norm: f32 = v.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(vectorizer.transform("unknown words").is_empty());
    }

    #[test]
    fn rarer_terms_get_higher_idf() {
        let docs = ["price", "price", "quote"];
        let vectorizer = TfidfVectorizer::fit(&docs, &VectorizerOptions::default()).unwrap();
        let price = vectorizer.idf[vectorizer.vocabulary["price"] as usize];
        let quote = vectorizer.idf[vectorizer.vocabulary["quote"] as usize];
        assert!(quote > price);
    }

    #[test]
    fn document_frequency_bounds_and_cap_apply() {
        let docs = ["a b", "a c", "a d", "b"];
        let options = VectorizerOptions {
            ngram_max: 1,
            max_features: 2,
            min_df: 1,
            max_df: 0.5,
        };
        let vectorizer = TfidfVectorizer::fit(&docs, &options).unwrap();
        // "a" is in 3 of 4 documents; "b" is most frequent of the rest.
        assert!(!vectorizer.vocabulary.contains_key("a"));
        assert_eq!(vectorizer.dim(), 2);
        assert!(vectorizer.vocabulary.contains_key("b"));
        assert!(vectorizer.validate().is_ok());

        let strict = VectorizerOptions {
            min_df: 5,
            ..VectorizerOptions::default()
        };
        assert_eq!(
            TfidfVectorizer::fit(&docs, &strict),
            Err(MlError::EmptyVocabulary)
        );
    }

    #[test]
    fn sparse_vector_lookup_and_dot() {
        let v = SparseVector::from_pairs(vec![(3, 2.0), (1, 1.0), (2, 0.0)]);
        assert_eq!(v.indices, vec![1, 3]);
        assert_eq!(v.get(3), 2.0);
        assert_eq!(v.get(2), 0.0);
        assert_eq!(v.dot(&[1.0, 1.0, 1.0, 0.5]), 2.0);
    }
}
