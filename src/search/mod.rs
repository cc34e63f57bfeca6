//! Relevance fusion: rerank, build features, score and keep the top K
//!
//! Embedding results arrive per model, already ranked. Every candidate is
//! rescored by every configured reranker, the per-model scores become a
//! feature vector, and the logistic relevance model turns each vector into a
//! probability.

mod select;

pub use select::TopKSelector;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::document::Document;
use crate::error::{FusionError, Result};
use crate::features::{CandidatePool, FeatureBuilder, QueryBundle};
use crate::model::RelevanceModel;
use crate::rerank::{rerank_all, MockTransport, RerankerRegistry};
use crate::score::{ScoreTable, ScoredDocument};

pub struct FusionPipeline {
    builder: FeatureBuilder,
    model: RelevanceModel,
    selector: TopKSelector,
    registry: RerankerRegistry,
}

impl FusionPipeline {
    pub fn new(config: &Config, registry: RerankerRegistry) -> Result<Self> {
        let builder = config.feature_builder();
        let model = RelevanceModel::from_params(&config.fusion.model)?;

        let available = builder.feature_names();
        if let Some(unknown) = model.feature_names().iter().find(|f| !available.contains(f)) {
            return Err(FusionError::UnknownFeature(unknown.clone()));
        }
        for reranker in builder.reranking_models() {
            registry.get(reranker)?;
        }

        Ok(Self {
            builder,
            model,
            selector: TopKSelector::new(config.fusion.top_k),
            registry,
        })
    }

    /// Pipeline whose rerankers answer through [`MockTransport`]
    pub fn with_mock_transport(config: &Config) -> Result<Self> {
        let registry = RerankerRegistry::from_endpoints(&config.rerankers, Arc::new(MockTransport::new()));
        Self::new(config, registry)
    }

    pub fn feature_builder(&self) -> &FeatureBuilder {
        &self.builder
    }

    pub fn model(&self) -> &RelevanceModel {
        &self.model
    }

    /// Union of all embedding results in configured model order
    pub fn candidate_pool(&self, results: &HashMap<String, Vec<Document>>) -> Result<CandidatePool> {
        let mut pool = CandidatePool::new();
        for model in self.builder.embedding_models() {
            pool.extend(embedding_results(results, model)?);
        }
        Ok(pool)
    }

    /// One score table per configured embedding model
    pub fn embedding_tables(&self, results: &HashMap<String, Vec<Document>>) -> Result<Vec<ScoreTable>> {
        self.builder
            .embedding_models()
            .iter()
            .map(|model| {
                let entries = embedding_results(results, model)?
                    .iter()
                    .map(|doc| ScoredDocument::new(doc.segment_id(), doc.score()))
                    .collect();
                ScoreTable::new(model.clone(), entries)
            })
            .collect()
    }

    /// Rerank the candidates from `results` and return the top documents.
    ///
    /// `results` maps each embedding model to its ranked documents. Inputs
    /// are left untouched.
    pub async fn fuse(&self, query: &str, results: &HashMap<String, Vec<Document>>) -> Result<Vec<Document>> {
        let pool = self.candidate_pool(results)?;
        let embedding = self.embedding_tables(results)?;
        info!("Fusing {} candidates for query \"{}\"", pool.len(), query);

        let reranking = rerank_all(
            &self.registry,
            query,
            pool.ids(),
            &pool.texts(),
            self.builder.reranking_models(),
        )
        .await?;

        let bundle = QueryBundle::new(pool, embedding, reranking)?;
        self.rank(&bundle)
    }

    /// Score an already assembled bundle and keep the top K
    pub fn rank(&self, bundle: &QueryBundle) -> Result<Vec<Document>> {
        let vectors = self.builder.build(bundle)?;
        let probabilities = self.model.predict_all(&vectors)?;
        let selected = self.selector.select(bundle.candidates(), &probabilities)?;

        debug!(
            "Selected {} of {} candidates (k = {})",
            selected.len(),
            bundle.candidates().len(),
            self.selector.k()
        );
        Ok(selected)
    }
}

fn embedding_results<'a>(results: &'a HashMap<String, Vec<Document>>, model: &str) -> Result<&'a [Document]> {
    results
        .get(model)
        .map(Vec::as_slice)
        .ok_or_else(|| FusionError::MissingTable {
            kind: "embedding",
            model: model.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sigmoid;
    use crate::sample;
    use pretty_assertions::assert_eq;

    fn mock_results() -> HashMap<String, Vec<Document>> {
        let mut results = HashMap::new();
        results.insert("bge".to_string(), sample::retrieval_results("bge", 24));
        results.insert("snowflake".to_string(), sample::retrieval_results("sf", 24));
        results
    }

    #[tokio::test]
    async fn test_fuse_returns_top_k() {
        let pipeline = FusionPipeline::with_mock_transport(&Config::default()).unwrap();
        let fused = pipeline.fuse("mocked local query", &mock_results()).await.unwrap();

        assert_eq!(fused.len(), 20);
        for pair in fused.windows(2) {
            assert!(pair[0].score() >= pair[1].score());
        }
        for doc in &fused {
            assert!(doc.score() > 0.0 && doc.score() < 1.0);
        }
    }

    #[tokio::test]
    async fn test_fuse_is_deterministic_and_non_mutating() {
        let pipeline = FusionPipeline::with_mock_transport(&Config::default()).unwrap();
        let results = mock_results();
        let before = results.clone();

        let first = pipeline.fuse("mocked local query", &results).await.unwrap();
        let second = pipeline.fuse("mocked local query", &results).await.unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(results, before);
    }

    #[test]
    fn test_candidates_follow_embedding_order() {
        let pipeline = FusionPipeline::with_mock_transport(&Config::default()).unwrap();
        let pool = pipeline.candidate_pool(&mock_results()).unwrap();

        assert_eq!(pool.len(), 48);
        assert_eq!(pool.ids()[0], "bge-title-0-0");
        assert_eq!(pool.ids()[24], "sf-title-0-0");
    }

    #[tokio::test]
    async fn test_missing_embedding_results() {
        let pipeline = FusionPipeline::with_mock_transport(&Config::default()).unwrap();
        let mut results = mock_results();
        results.remove("snowflake");

        let err = pipeline.fuse("q", &results).await.unwrap_err();
        assert!(matches!(err, FusionError::MissingTable { kind: "embedding", .. }));
    }

    #[test]
    fn test_rank_matches_manual_logit() {
        let mut config = Config::default();
        config.fusion.embedding_models = vec!["e".to_string()];
        config.fusion.reranking_models = vec!["bge".to_string()];
        config.fusion.model.feature_names = vec!["emb_sim_e".to_string(), "rerank_relative_bge".to_string()];
        config.fusion.model.weights = vec![2.0, 1.0];
        config.fusion.model.bias = -1.0;
        config.fusion.top_k = 1;
        let pipeline = FusionPipeline::with_mock_transport(&config).unwrap();

        let mut pool = CandidatePool::new();
        pool.insert(Document::new("a", "", 0, 0.0));
        pool.insert(Document::new("b", "", 0, 0.0));
        let emb = ScoreTable::new("e", vec![ScoredDocument::new("a-0", 0.8)]).unwrap();
        let rr = ScoreTable::new(
            "bge",
            vec![ScoredDocument::new("a-0", 0.2), ScoredDocument::new("b-0", 0.6)],
        )
        .unwrap();
        let bundle = QueryBundle::new(pool, vec![emb], vec![rr]).unwrap();

        let top = pipeline.rank(&bundle).unwrap();
        assert_eq!(top.len(), 1);

        // b is absent from "e" and falls back to its lowest score, 0.8
        let z_b = -1.0 + 0.8 * 2.0 + 0.6 / 0.4;
        let z_a = -1.0 + 0.8 * 2.0 + 0.2 / 0.4;
        assert!(z_b > z_a);
        assert_eq!(top[0].segment_id(), "b-0");
        assert!((top[0].score() - sigmoid(z_b)).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_reranker_rejected() {
        let mut config = Config::default();
        config.rerankers.remove("bge");
        assert!(matches!(
            FusionPipeline::with_mock_transport(&config),
            Err(FusionError::UnknownModel(_))
        ));
    }
}
