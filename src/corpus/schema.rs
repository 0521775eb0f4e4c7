use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Keywords and canned replies for one intent category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySpec {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub responses: Vec<String>,
    #[serde(default, rename = "followUp", alias = "follow_up")]
    pub follow_up: Option<Vec<String>>,
}

impl CategorySpec {
    pub fn first_response(&self) -> Option<&str> {
        self.responses.first().map(String::as_str)
    }

    pub fn first_follow_up(&self) -> Option<&str> {
        self.follow_up
            .as_ref()
            .and_then(|items| items.first())
            .map(String::as_str)
    }
}

/// Category name to spec. Ordered by name so corpus generation is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySchema {
    categories: BTreeMap<String, CategorySpec>,
}

impl CategorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, replacing any previous spec with that name.
    pub fn with_category(mut self, name: impl Into<String>, spec: CategorySpec) -> Self {
        self.categories.insert(name.into(), spec);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: CategorySpec) {
        self.categories.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&CategorySpec> {
        self.categories.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategorySpec)> {
        self.categories.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Parse the JSON form: `{"name": {"keywords": [..], "responses": [..], "followUp": [..]}}`.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
