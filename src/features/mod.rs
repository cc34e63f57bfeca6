//! Feature construction from per-model score tables
//!
//! For every candidate document, each embedding model contributes
//! `emb_sim_{model}` and `emb_relative_{model}`, each reranking model
//! contributes `rerank_sim_{model}` and `rerank_relative_{model}`.
//! Relative features divide a raw score by the mean of that model's top
//! three scores, which puts models with different scales on a common footing.

use std::collections::HashMap;

use tracing::debug;

use crate::document::Document;
use crate::error::{FusionError, Result};
use crate::score::ScoreTable;

/// Candidate documents for one query, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    order: Vec<String>,
    documents: HashMap<String, Document>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document under its segment id.
    ///
    /// An id seen before keeps its position while the newer payload replaces
    /// the stored one.
    pub fn insert(&mut self, document: Document) {
        let id = document.segment_id();
        if !self.documents.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.documents.insert(id, document);
    }

    pub fn extend<'a>(&mut self, documents: impl IntoIterator<Item = &'a Document>) {
        for doc in documents {
            self.insert(doc.clone());
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Documents in pool order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.order
            .iter()
            .filter_map(|id| self.documents.get(id).map(|doc| (id.as_str(), doc)))
    }

    /// Document contents in pool order, as sent to rerankers
    pub fn texts(&self) -> Vec<String> {
        self.iter().map(|(_, doc)| doc.content.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Everything scored for one query
#[derive(Debug, Clone)]
pub struct QueryBundle {
    candidates: CandidatePool,
    embedding: HashMap<String, ScoreTable>,
    reranking: HashMap<String, ScoreTable>,
}

impl QueryBundle {
    /// Assemble a bundle, checking that every scored id is a candidate
    pub fn new(
        candidates: CandidatePool,
        embedding: Vec<ScoreTable>,
        reranking: Vec<ScoreTable>,
    ) -> Result<Self> {
        for table in embedding.iter().chain(reranking.iter()) {
            if let Some(stray) = table
                .entries()
                .iter()
                .find(|e| !candidates.contains(&e.document_id))
            {
                return Err(FusionError::UnknownDocument {
                    model: table.model().to_string(),
                    document_id: stray.document_id.clone(),
                });
            }
        }

        let by_model = |tables: Vec<ScoreTable>| {
            tables
                .into_iter()
                .map(|t| (t.model().to_string(), t))
                .collect::<HashMap<_, _>>()
        };

        Ok(Self {
            candidates,
            embedding: by_model(embedding),
            reranking: by_model(reranking),
        })
    }

    pub fn candidates(&self) -> &CandidatePool {
        &self.candidates
    }

    pub fn embedding_table(&self, model: &str) -> Result<&ScoreTable> {
        self.embedding
            .get(model)
            .ok_or_else(|| FusionError::MissingTable {
                kind: "embedding",
                model: model.to_string(),
            })
    }

    pub fn reranking_table(&self, model: &str) -> Result<&ScoreTable> {
        self.reranking
            .get(model)
            .ok_or_else(|| FusionError::MissingTable {
                kind: "reranking",
                model: model.to_string(),
            })
    }
}

/// Named features of one document, in builder order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    document_id: String,
    values: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> &[(String, f64)] {
        &self.values
    }
}

/// Per-table statistics computed once per query
struct TableStats<'a> {
    model: &'a str,
    table: &'a ScoreTable,
    lowest: f64,
    top_mean: f64,
}

impl<'a> TableStats<'a> {
    fn new(table: &'a ScoreTable) -> Result<Self> {
        let top_mean = table.top_mean()?;
        if top_mean == 0.0 {
            return Err(FusionError::ZeroNormalizer {
                model: table.model().to_string(),
            });
        }
        Ok(Self {
            model: table.model(),
            table,
            lowest: table.lowest()?,
            top_mean,
        })
    }
}

/// Builds feature vectors for a configured set of embedding and reranking models
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    embedding_models: Vec<String>,
    reranking_models: Vec<String>,
}

impl FeatureBuilder {
    pub fn new(embedding_models: Vec<String>, reranking_models: Vec<String>) -> Self {
        Self {
            embedding_models,
            reranking_models,
        }
    }

    pub fn embedding_models(&self) -> &[String] {
        &self.embedding_models
    }

    pub fn reranking_models(&self) -> &[String] {
        &self.reranking_models
    }

    /// Every feature name this builder emits, in emission order
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(2 * (self.embedding_models.len() + self.reranking_models.len()));
        for model in &self.embedding_models {
            names.push(format!("emb_sim_{model}"));
            names.push(format!("emb_relative_{model}"));
        }
        for model in &self.reranking_models {
            names.push(format!("rerank_sim_{model}"));
            names.push(format!("rerank_relative_{model}"));
        }
        names
    }

    /// One feature vector per candidate, in candidate order.
    ///
    /// Documents missing from an embedding table take that table's lowest
    /// score. Documents missing from a reranking table are an error.
    pub fn build(&self, bundle: &QueryBundle) -> Result<Vec<FeatureVector>> {
        let embedding = self
            .embedding_models
            .iter()
            .map(|m| bundle.embedding_table(m).and_then(TableStats::new))
            .collect::<Result<Vec<_>>>()?;
        let reranking = self
            .reranking_models
            .iter()
            .map(|m| bundle.reranking_table(m).and_then(TableStats::new))
            .collect::<Result<Vec<_>>>()?;

        let mut vectors = Vec::with_capacity(bundle.candidates().len());
        for (doc_id, _) in bundle.candidates().iter() {
            let mut values = Vec::with_capacity(2 * (embedding.len() + reranking.len()));

            for stats in &embedding {
                let sim = stats.table.get(doc_id).unwrap_or(stats.lowest);
                values.push((format!("emb_sim_{}", stats.model), sim));
                values.push((format!("emb_relative_{}", stats.model), sim / stats.top_mean));
            }

            for stats in &reranking {
                let sim = stats
                    .table
                    .get(doc_id)
                    .ok_or_else(|| FusionError::MissingScore {
                        model: stats.model.to_string(),
                        document_id: doc_id.to_string(),
                    })?;
                values.push((format!("rerank_sim_{}", stats.model), sim));
                values.push((format!("rerank_relative_{}", stats.model), sim / stats.top_mean));
            }

            vectors.push(FeatureVector {
                document_id: doc_id.to_string(),
                values,
            });
        }

        debug!(
            "Built {} feature vectors ({} embedding, {} reranking models)",
            vectors.len(),
            embedding.len(),
            reranking.len()
        );

        Ok(vectors)
    }
}
