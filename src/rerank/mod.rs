//! Reranking collaborators
//!
//! A [`Reranker`] rescores a fixed candidate set for a query. The
//! [`RerankerRegistry`] resolves configured model ids to rerankers and
//! [`rerank_all`] fans one request per model out onto tokio tasks, joining
//! every result before features are built.

mod mock;
mod transport;

pub use mock::MockTransport;
pub use transport::{
    RerankRequest, RerankResponse, RerankResult, RerankTransport, RerankedText, TransportResponse,
};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::RerankerEndpoint;
use crate::error::{FusionError, Result};
use crate::score::{ScoreTable, ScoredDocument};

/// One rescored document
#[derive(Debug, Clone, PartialEq)]
pub struct RerankHit {
    /// Position of the document in the rerank input
    pub index: usize,
    pub relevance_score: f64,
    pub text: String,
}

/// Rescores documents for a query
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Returns one hit per scored document, best first
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<RerankHit>>;
}

/// Reranker backed by a service endpoint reached through a transport
pub struct EndpointReranker {
    model: String,
    endpoint: RerankerEndpoint,
    transport: Arc<dyn RerankTransport>,
}

impl EndpointReranker {
    pub fn new(
        model: impl Into<String>,
        endpoint: RerankerEndpoint,
        transport: Arc<dyn RerankTransport>,
    ) -> Self {
        Self {
            model: model.into(),
            endpoint,
            transport,
        }
    }

    pub fn url(&self) -> String {
        format!("{}/rerank", self.endpoint.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Reranker for EndpointReranker {
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<RerankHit>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let request = RerankRequest {
            model: self.endpoint.name.clone(),
            query: query.to_string(),
            documents: documents.to_vec(),
        };

        let response = self.transport.post(&self.url(), &request).await?;
        if !response.is_success() {
            return Err(FusionError::Transport {
                model: self.model.clone(),
                status: response.status,
                body: response.body,
            });
        }

        let parsed: RerankResponse =
            serde_json::from_str(&response.body).map_err(|e| FusionError::Protocol {
                model: self.model.clone(),
                message: e.to_string(),
            })?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| RerankHit {
                index: r.index,
                relevance_score: r.relevance_score,
                text: r.document.text,
            })
            .collect())
    }
}

/// Configured rerankers keyed by model id
#[derive(Clone, Default)]
pub struct RerankerRegistry {
    rerankers: BTreeMap<String, Arc<dyn Reranker>>,
}

impl RerankerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One [`EndpointReranker`] per configured endpoint, all sharing `transport`
    pub fn from_endpoints(
        endpoints: &BTreeMap<String, RerankerEndpoint>,
        transport: Arc<dyn RerankTransport>,
    ) -> Self {
        let mut registry = Self::new();
        for (model, endpoint) in endpoints {
            registry.register(
                model.clone(),
                Arc::new(EndpointReranker::new(model.clone(), endpoint.clone(), transport.clone())),
            );
        }
        registry
    }

    pub fn register(&mut self, model: impl Into<String>, reranker: Arc<dyn Reranker>) {
        self.rerankers.insert(model.into(), reranker);
    }

    pub fn get(&self, model: &str) -> Result<Arc<dyn Reranker>> {
        self.rerankers
            .get(model)
            .cloned()
            .ok_or_else(|| FusionError::UnknownModel(model.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.rerankers.keys().map(String::as_str)
    }
}

/// Rerank `documents` with every model in `models` concurrently.
///
/// `document_ids[i]` names `documents[i]`; hits are mapped back through it.
/// Tables come back in `models` order. The first failure aborts the rest.
pub async fn rerank_all(
    registry: &RerankerRegistry,
    query: &str,
    document_ids: &[String],
    documents: &[String],
    models: &[String],
) -> Result<Vec<ScoreTable>> {
    let rerankers = models
        .iter()
        .map(|m| registry.get(m))
        .collect::<Result<Vec<_>>>()?;

    let query: Arc<str> = Arc::from(query);
    let documents: Arc<[String]> = Arc::from(documents);

    let mut tasks = JoinSet::new();
    for (slot, reranker) in rerankers.into_iter().enumerate() {
        let query = query.clone();
        let documents = documents.clone();
        tasks.spawn(async move { (slot, reranker.rerank(&query, &documents).await) });
    }

    let mut hits: Vec<Option<Vec<RerankHit>>> = vec![None; models.len()];
    while let Some(joined) = tasks.join_next().await {
        let (slot, result) = joined.map_err(|e| FusionError::TaskFailed(e.to_string()))?;
        hits[slot] = Some(result?);
    }

    let mut tables = Vec::with_capacity(models.len());
    for (model, model_hits) in models.iter().zip(hits) {
        let model_hits = model_hits
            .ok_or_else(|| FusionError::TaskFailed(format!("no result for reranker '{model}'")))?;
        debug!("Reranker '{}' scored {} documents", model, model_hits.len());
        tables.push(hits_to_table(model, model_hits, document_ids)?);
    }

    info!("Collected rerank scores from {} models", tables.len());
    Ok(tables)
}

/// Map rerank hits back to document ids
pub fn hits_to_table(model: &str, hits: Vec<RerankHit>, document_ids: &[String]) -> Result<ScoreTable> {
    let entries = hits
        .into_iter()
        .map(|hit| {
            document_ids
                .get(hit.index)
                .map(|id| ScoredDocument::new(id.clone(), hit.relevance_score))
                .ok_or_else(|| FusionError::RerankIndexOutOfRange {
                    model: model.to_string(),
                    index: hit.index,
                    len: document_ids.len(),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    ScoreTable::new(model, entries)
}
