//! Configuration system for medclass.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace `medclass.toml` -> environment variables -> explicit overrides.

use crate::algorithms::CentroidParams;
use crate::features::{LabelOrder, VectorizerParams};
use crate::training::{LabelPolicy, TrainingSettings};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the per-workspace configuration file.
pub const WORKSPACE_CONFIG_FILE: &str = "medclass.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedclassConfig {
    pub data: DataConfig,
    pub text: TextConfig,
    pub training: TrainingConfig,
    pub paths: PathsConfig,
}

/// Corpus file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Field delimiter of corpus CSV files.
    pub delimiter: char,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { delimiter: ';' }
    }
}

/// Normalization and vectorization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub max_features: usize,
    pub ngram_range: (usize, usize),
    pub min_df: usize,
    pub max_df: f64,
    /// Words the vectorizer drops after normalization.
    pub stop_words: Vec<String>,
    /// Words added to the normalizer's built-in stop-word set.
    pub extra_stop_words: Vec<String>,
    /// Abbreviations added to (or overriding) the built-in dictionary.
    pub abbreviations: BTreeMap<String, String>,
    pub label_order: LabelOrder,
}

impl Default for TextConfig {
    fn default() -> Self {
        let vectorizer = VectorizerParams::default();
        Self {
            max_features: vectorizer.max_features,
            ngram_range: vectorizer.ngram_range,
            min_df: vectorizer.min_df,
            max_df: vectorizer.max_df,
            stop_words: vectorizer.stop_words,
            extra_stop_words: Vec::new(),
            abbreviations: BTreeMap::new(),
            label_order: LabelOrder::Sorted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub test_ratio: f64,
    pub seed: u64,
    pub label_policy: LabelPolicy,
    /// Share of the centroid score taken by the metadata block.
    pub metadata_weight: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            label_policy: LabelPolicy::FirstLabel,
            metadata_weight: CentroidParams::default().metadata_weight,
        }
    }
}

/// Filesystem locations, relative paths resolve against the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub datasets_dir: PathBuf,
    pub models_dir: PathBuf,
    pub results_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            datasets_dir: PathBuf::from("data/raw"),
            models_dir: PathBuf::from("models"),
            results_dir: PathBuf::from("results"),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

impl PathsConfig {
    /// Copy with every relative path joined onto `workspace`.
    pub fn resolve(&self, workspace: &Path) -> Self {
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                workspace.join(p)
            }
        };
        Self {
            datasets_dir: join(&self.datasets_dir),
            models_dir: join(&self.models_dir),
            results_dir: join(&self.results_dir),
            logs_dir: join(&self.logs_dir),
        }
    }
}

impl MedclassConfig {
    pub fn vectorizer_params(&self) -> VectorizerParams {
        VectorizerParams {
            max_features: self.text.max_features,
            ngram_range: self.text.ngram_range,
            min_df: self.text.min_df,
            max_df: self.text.max_df,
            stop_words: self.text.stop_words.clone(),
        }
    }

    pub fn training_settings(&self) -> TrainingSettings {
        TrainingSettings {
            vectorizer: self.vectorizer_params(),
            label_order: self.text.label_order,
            label_policy: self.training.label_policy,
            test_ratio: self.training.test_ratio,
            seed: self.training.seed,
            abbreviations: self.text.abbreviations.clone(),
            extra_stop_words: self.text.extra_stop_words.clone(),
        }
    }

    pub fn centroid_params(&self) -> CentroidParams {
        CentroidParams {
            metadata_weight: self.training.metadata_weight,
        }
    }

    /// Check value ranges. Returns one message per problem; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Err(e) = self.vectorizer_params().validate() {
            problems.push(format!("text: {e}"));
        }

        let ratio = self.training.test_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            problems.push(format!("training.test_ratio must be in (0, 1), got {ratio}"));
        }
        let weight = self.training.metadata_weight;
        if !(0.0..=1.0).contains(&weight) {
            problems.push(format!(
                "training.metadata_weight must be in [0, 1], got {weight}"
            ));
        }
        if self.data.delimiter.is_whitespace() || self.data.delimiter == '"' {
            problems.push(format!(
                "data.delimiter {:?} cannot be whitespace or a quote",
                self.data.delimiter
            ));
        }
        if self
            .text
            .abbreviations
            .keys()
            .any(|k| k.trim().is_empty() || k.contains(char::is_whitespace))
        {
            problems.push("text.abbreviations keys must be single non-empty words".to_string());
        }
        problems
    }
}

/// Load configuration by merging all layers.
///
/// Order (later wins): defaults, `<config dir>/medclass/config.toml`,
/// `<workspace>/medclass.toml`, `MEDCLASS_*` environment variables (`__`
/// separates nesting, e.g. `MEDCLASS_TRAINING__SEED=7`), then `overrides`.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&MedclassConfig>,
) -> Result<MedclassConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(MedclassConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "medclass", "medclass") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(WORKSPACE_CONFIG_FILE);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    figment = figment.merge(Env::prefixed("MEDCLASS_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}
