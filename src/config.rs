//! Service configuration stored as TOML under the app root.
//!
//! Every field has a default, so a missing, empty or partial file loads.
//! Keys (TOML): `model`, `corpus`, `vectorizer`, `forest`, `logreg`,
//! `naive_bayes`, `feedback`, `responses`, `storage`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{self, AppDirError};
use crate::calibration::DEFAULT_LOOKUP_MIN_CONFIDENCE;
use crate::corpus::CorpusBuilder;
use crate::feedback::DEFAULT_RETRAIN_THRESHOLD;
use crate::ml::forest::ForestOptions;
use crate::ml::logreg::LogRegOptions;
use crate::ml::naive_bayes::NaiveBayesOptions;
use crate::ml::{ClassifierKind, ClassifierOptions, PipelineOptions, VectorizerOptions};
use crate::persistence::PersistenceError;
use crate::persistence::fs_store::atomic_write;

/// Default filename of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to resolve the app directory: {0}")]
    AppDir(#[from] AppDirError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: PersistenceError,
    },
}

fn default_seed() -> u64 {
    42
}

fn default_test_fraction() -> f32 {
    0.2
}

fn default_true() -> bool {
    true
}

fn default_retrain_threshold() -> usize {
    DEFAULT_RETRAIN_THRESHOLD
}

fn default_lookup_min_confidence() -> f32 {
    DEFAULT_LOOKUP_MIN_CONFIDENCE
}

fn default_response() -> String {
    "I'm not sure I understood that. Could you rephrase, or ask about one of the topics I know?"
        .to_string()
}

fn default_hedge_prefix() -> String {
    "I think you're asking about this, but I'm not completely sure:".to_string()
}

fn default_fallback_system_prompt() -> String {
    "You are a helpful assistant for a small business website. Answer briefly and \
     suggest contacting the team when you are unsure."
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default)]
    pub classifier: ClassifierKind,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Share of each category held out for evaluation.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            classifier: ClassifierKind::default(),
            seed: default_seed(),
            test_fraction: default_test_fraction(),
        }
    }
}

/// One row of the keyword synonym table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymEntry {
    pub term: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusSettings {
    /// Replaces the built-in synonym table when non-empty.
    #[serde(default)]
    pub synonyms: Vec<SynonymEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSettings {
    /// Retrain once more than this many records are pending.
    #[serde(default = "default_retrain_threshold")]
    pub retrain_threshold: usize,
    /// Add the last schema's synthetic corpus to feedback retrains.
    #[serde(default = "default_true")]
    pub union_schema_on_retrain: bool,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            retrain_threshold: default_retrain_threshold(),
            union_schema_on_retrain: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSettings {
    #[serde(default = "default_response")]
    pub default_response: String,
    #[serde(default = "default_hedge_prefix")]
    pub hedge_prefix: String,
    /// Category replies are used only above this confidence.
    #[serde(default = "default_lookup_min_confidence")]
    pub lookup_min_confidence: f32,
    #[serde(default = "default_fallback_system_prompt")]
    pub fallback_system_prompt: String,
}

impl Default for ResponseSettings {
    fn default() -> Self {
        Self {
            default_response: default_response(),
            hedge_prefix: default_hedge_prefix(),
            lookup_min_confidence: default_lookup_min_confidence(),
            fallback_system_prompt: default_fallback_system_prompt(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    Sqlite,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Overrides `<app root>/store`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl StorageSettings {
    pub fn resolve_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(app_dirs::store_dir()?),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub corpus: CorpusSettings,
    #[serde(default)]
    pub vectorizer: VectorizerOptions,
    #[serde(default)]
    pub forest: ForestOptions,
    #[serde(default)]
    pub logreg: LogRegOptions,
    #[serde(default)]
    pub naive_bayes: NaiveBayesOptions,
    #[serde(default)]
    pub feedback: FeedbackSettings,
    #[serde(default)]
    pub responses: ResponseSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

impl ServiceConfig {
    /// Corpus builder using the configured synonym table, if any.
    pub fn corpus_builder(&self) -> CorpusBuilder {
        if self.corpus.synonyms.is_empty() {
            return CorpusBuilder::default();
        }
        CorpusBuilder::with_synonyms(
            self.corpus
                .synonyms
                .iter()
                .map(|entry| (entry.term.to_lowercase(), entry.synonyms.clone()))
                .collect(),
        )
    }

    /// Training options derived from the model sections.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            classifier: self.model.classifier,
            seed: self.model.seed,
            test_fraction: self.model.test_fraction.clamp(0.0, 0.9),
            vectorizer: self.vectorizer.clone(),
            models: ClassifierOptions {
                forest: self.forest.clone(),
                logreg: self.logreg.clone(),
                naive_bayes: self.naive_bayes.clone(),
            }
            .with_seed(self.model.seed),
        }
    }
}

/// Path of the configuration file inside the app root.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load from the app root, returning defaults if the file is missing.
pub fn load_or_default() -> Result<ServiceConfig, ConfigError> {
    load_from(&config_path()?)
}

/// Load from a specific path, returning defaults if the file is missing.
pub fn load_from(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ServiceConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Write to the app root's configuration file.
pub fn save(config: &ServiceConfig) -> Result<PathBuf, ConfigError> {
    let path = config_path()?;
    save_to_path(config, &path)?;
    Ok(path)
}

/// Write atomically, creating parent directories as needed.
pub fn save_to_path(config: &ServiceConfig, path: &Path) -> Result<(), ConfigError> {
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source: PersistenceError::Io {
                path: parent.to_path_buf(),
                source,
            },
        })?;
    }
    atomic_write(path, data.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = load_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.model.seed, 42);
        assert_eq!(config.forest.n_estimators, 100);
        assert_eq!(config.feedback.retrain_threshold, 10);
        assert_eq!(config.responses.lookup_min_confidence, 0.3);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[model]\nclassifier = \"naive_bayes\"\n\n[feedback]\nretrain_threshold = 3\n\n[storage]\nbackend = \"sqlite\"\n",
        )
        .unwrap();
        let config = load_from(&path).unwrap();
        assert_eq!(config.model.classifier, ClassifierKind::NaiveBayes);
        assert_eq!(config.model.test_fraction, 0.2);
        assert_eq!(config.feedback.retrain_threshold, 3);
        assert!(config.feedback.union_schema_on_retrain);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.vectorizer.ngram_max, 2);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut config = ServiceConfig::default();
        config.model.classifier = ClassifierKind::LogisticRegression;
        config.storage.dir = Some(dir.path().join("store"));
        save_to_path(&config, &path).unwrap();
        assert_eq!(load_from(&path).unwrap(), config);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "model = [").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn configured_synonyms_replace_builtin_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[[corpus.synonyms]]\nterm = \"CRM\"\nsynonyms = [\"customer portal\"]\n",
        )
        .unwrap();
        let config = load_from(&path).unwrap();
        let variations = config.corpus_builder().keyword_variations("what is crm");
        assert_eq!(variations, vec!["what is crm", "customer portal"]);

        let builtin = ServiceConfig::default().corpus_builder();
        assert_eq!(builtin.keyword_variations("what is crm"), vec!["what is crm"]);
        assert_eq!(
            builtin.keyword_variations("what is ml"),
            vec!["what is ml", "machine learning"]
        );
    }

    #[test]
    fn save_writes_under_app_root() {
        let dir = tempdir().unwrap();
        let _guard = app_dirs::BaseDirGuard::set(dir.path().to_path_buf());
        let mut config = ServiceConfig::default();
        config.storage.backend = StorageBackend::Sqlite;
        let path = save(&config).unwrap();
        assert_eq!(path, config_path().unwrap());
        assert_eq!(load_or_default().unwrap(), config);
    }

    #[test]
    fn pipeline_options_share_one_seed() {
        let mut config = ServiceConfig::default();
        config.model.seed = 9;
        let options = config.pipeline_options();
        assert_eq!(options.seed, 9);
        assert_eq!(options.models.forest.seed, 9);
        assert_eq!(options.models.logreg.seed, 9);
    }
}
