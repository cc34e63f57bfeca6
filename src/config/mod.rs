use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::FusionError;
use crate::features::FeatureBuilder;
use crate::merge::{DEFAULT_EXPONENT, DEFAULT_MERGE_TOP_K};

/// Default number of documents returned by the fusion path
pub const DEFAULT_FUSION_TOP_K: usize = 20;

/// Global configuration for fuserank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Score fusion configuration
    pub fusion: FusionConfig,

    /// Two-list merge configuration
    pub merge: MergeConfig,

    /// Reranking services keyed by model id
    pub rerankers: BTreeMap<String, RerankerEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FusionConfig {
    /// Embedding models whose scores arrive with the candidates, in candidate order
    pub embedding_models: Vec<String>,

    /// Reranking models queried for every candidate
    pub reranking_models: Vec<String>,

    /// Number of documents returned
    pub top_k: usize,

    /// Trained relevance model
    pub model: ModelParams,
}

/// Parameters of the logistic relevance model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModelParams {
    /// Features fed to the model, in weight order
    pub feature_names: Vec<String>,

    /// One weight per feature name
    pub weights: Vec<f64>,

    pub bias: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MergeConfig {
    /// Number of merged documents returned
    pub top_k: usize,

    /// Power-mean exponent; larger values lean harder toward the better score
    pub exponent: f64,
}

/// Where a reranking model is served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RerankerEndpoint {
    /// Service root; requests go to `{base_url}/rerank`
    pub base_url: String,

    /// Model name sent in the request body
    pub name: String,
}

impl Config {
    /// Load configuration from `path`, the default location, or built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let source = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };

        let config = match source {
            Some(p) => {
                info!("Loading configuration from {}", p.display());
                Self::from_file(&p)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// `<config dir>/fuserank/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("fuserank").join("config.json"))
    }

    /// JSON schema of the configuration document
    pub fn schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> std::result::Result<(), FusionError> {
        let invalid = |msg: String| Err(FusionError::InvalidConfig(msg));

        let fusion = &self.fusion;
        for (kind, models) in [
            ("embedding", &fusion.embedding_models),
            ("reranking", &fusion.reranking_models),
        ] {
            if models.is_empty() {
                return invalid(format!("no {kind} models configured"));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = models.iter().find(|m| !seen.insert(m.as_str())) {
                return invalid(format!("{kind} model '{dup}' listed twice"));
            }
        }

        for model in &fusion.reranking_models {
            if !self.rerankers.contains_key(model) {
                return Err(FusionError::UnknownModel(model.clone()));
            }
        }

        let params = &fusion.model;
        if params.feature_names.len() != params.weights.len() {
            return invalid(format!(
                "{} feature names but {} weights",
                params.feature_names.len(),
                params.weights.len()
            ));
        }
        if params.feature_names.is_empty() {
            return invalid("relevance model has no features".to_string());
        }

        let available = self.feature_builder().feature_names();
        if let Some(unknown) = params.feature_names.iter().find(|f| !available.contains(f)) {
            return Err(FusionError::UnknownFeature(unknown.clone()));
        }

        if fusion.top_k == 0 {
            return invalid("fusion.top_k must be positive".to_string());
        }
        if self.merge.top_k == 0 {
            return invalid("merge.top_k must be positive".to_string());
        }
        if !self.merge.exponent.is_finite() || self.merge.exponent < 1.0 {
            return invalid(format!("merge.exponent must be finite and >= 1, got {}", self.merge.exponent));
        }

        Ok(())
    }

    pub fn feature_builder(&self) -> FeatureBuilder {
        FeatureBuilder::new(
            self.fusion.embedding_models.clone(),
            self.fusion.reranking_models.clone(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut rerankers = BTreeMap::new();
        rerankers.insert(
            "bge".to_string(),
            RerankerEndpoint {
                base_url: "http://vllm-bge-reranker-service.default.svc.cluster.local:80".to_string(),
                name: "/models/BAAI_bge-reranker-v2-m3".to_string(),
            },
        );
        rerankers.insert(
            "jina".to_string(),
            RerankerEndpoint {
                base_url: "http://vllm-jina-reranker-m0-service.default.svc.cluster.local:80".to_string(),
                name: "/models/jinaai_jina-reranker-m0".to_string(),
            },
        );

        Self {
            fusion: FusionConfig::default(),
            merge: MergeConfig::default(),
            rerankers,
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            embedding_models: vec!["bge".to_string(), "snowflake".to_string()],
            reranking_models: vec!["jina".to_string(), "bge".to_string()],
            top_k: DEFAULT_FUSION_TOP_K,
            model: ModelParams::default(),
        }
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            feature_names: [
                "emb_sim_bge",
                "emb_relative_bge",
                "emb_relative_snowflake",
                "rerank_sim_jina",
                "rerank_sim_bge",
                "rerank_relative_bge",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            weights: vec![
                -1.44120035,
                1.89585005,
                7.59292896,
                1.39456976,
                0.38541923,
                2.61055952,
            ],
            bias: -13.5021328,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_MERGE_TOP_K,
            exponent: DEFAULT_EXPONENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.fusion.top_k, 20);
        assert_eq!(config.merge.top_k, 5);
        assert_eq!(config.merge.exponent, 2.0);
    }

    #[test]
    fn test_weight_length_mismatch() {
        let mut config = Config::default();
        config.fusion.model.weights.pop();
        assert!(matches!(config.validate(), Err(FusionError::InvalidConfig(_))));
    }

    #[test]
    fn test_unregistered_reranker() {
        let mut config = Config::default();
        config.rerankers.remove("jina");
        assert!(matches!(config.validate(), Err(FusionError::UnknownModel(m)) if m == "jina"));
    }

    #[test]
    fn test_feature_outside_model_lists() {
        let mut config = Config::default();
        config.fusion.model.feature_names[0] = "emb_sim_e5".to_string();
        assert!(matches!(config.validate(), Err(FusionError::UnknownFeature(f)) if f == "emb_sim_e5"));
    }

    #[test]
    fn test_exponent_below_one_rejected() {
        let mut config = Config::default();
        config.merge.exponent = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let mut config = Config::default();
        config.fusion.embedding_models.push("bge".to_string());
        assert!(matches!(config.validate(), Err(FusionError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut expected = Config::default();
        expected.merge.top_k = 3;
        expected.merge.exponent = 4.0;
        std::fs::write(&path, serde_json::to_string_pretty(&expected).unwrap()).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, expected);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"merge": {"top_k": 8, "exponent": 3.0}}"#).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.merge.top_k, 8);
        assert_eq!(loaded.fusion, FusionConfig::default());
    }

    #[test]
    fn test_partial_sections_fill_missing_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"fusion": {"top_k": 10}, "merge": {"exponent": 3.0}}"#).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.fusion.top_k, 10);
        assert_eq!(loaded.fusion.model, ModelParams::default());
        assert_eq!(loaded.fusion.embedding_models, FusionConfig::default().embedding_models);
        assert_eq!(loaded.merge.exponent, 3.0);
        assert_eq!(loaded.merge.top_k, DEFAULT_MERGE_TOP_K);
    }

    #[test]
    fn test_invalid_file_rejected_at_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"merge": {"top_k": 0, "exponent": 2.0}}"#).unwrap();

        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_schema_names_sections() {
        let schema = serde_json::to_value(Config::schema()).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("fusion").is_some());
        assert!(properties.get("merge").is_some());
        assert!(properties.get("rerankers").is_some());
    }
}
