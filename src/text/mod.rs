//! Text handling shared by training and inference.
//!
//! `normalize` produces the token string the classifier sees. `features`
//! produces diagnostics for observability only; nothing in `ml` reads them.

pub mod features;
mod lemma;
pub mod normalize;
mod sentiment;
mod stopwords;

pub use features::{FeatureSet, extract_features};
pub use normalize::normalize;
