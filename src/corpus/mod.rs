//! Category schema and training corpus types.

pub mod builder;
pub mod example;
pub mod schema;

pub use builder::CorpusBuilder;
pub use example::{ExampleSource, TrainingExample};
pub use schema::{CategorySchema, CategorySpec};
