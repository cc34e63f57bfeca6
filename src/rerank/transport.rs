//! Request/response shapes of the reranking service and the transport seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Body POSTed to `{base_url}/rerank`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankRequest {
    pub model: String,
    pub query: String,
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankResponse {
    pub results: Vec<RerankResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankResult {
    /// Position of the document in the request's `documents`
    pub index: usize,
    pub relevance_score: f64,
    pub document: RerankedText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankedText {
    pub text: String,
}

/// Raw status and body returned by a transport
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Delivers rerank requests to a service.
///
/// Implementations own connection handling, retries and authentication.
#[async_trait]
pub trait RerankTransport: Send + Sync {
    async fn post(&self, url: &str, request: &RerankRequest) -> Result<TransportResponse>;
}
