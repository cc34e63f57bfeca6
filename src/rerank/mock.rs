//! In-process transport with deterministic scores
//!
//! Document `i` scores `1 / (i + 1) + (len(query) mod 5) * 0.001`, so the
//! original order is also the rerank order.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use super::transport::{
    RerankRequest, RerankResponse, RerankResult, RerankTransport, RerankedText, TransportResponse,
};
use crate::error::{FusionError, Result};

#[derive(Debug, Default)]
pub struct MockTransport {
    fail_status: Option<u16>,
    requests: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that answers every request with `status`
    pub fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            requests: AtomicUsize::new(0),
        }
    }

    /// Number of requests served so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Score the mock assigns to the document at `index`
    pub fn score(query: &str, index: usize) -> f64 {
        1.0 / (index as f64 + 1.0) + (query.chars().count() % 5) as f64 * 0.001
    }
}

#[async_trait]
impl RerankTransport for MockTransport {
    async fn post(&self, url: &str, request: &RerankRequest) -> Result<TransportResponse> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        debug!("Mock rerank POST {} ({} documents)", url, request.documents.len());

        if let Some(status) = self.fail_status {
            return Ok(TransportResponse {
                status,
                body: format!("mock failure for {}", request.model),
            });
        }

        let results = request
            .documents
            .iter()
            .enumerate()
            .map(|(index, text)| RerankResult {
                index,
                relevance_score: Self::score(&request.query, index),
                document: RerankedText { text: text.clone() },
            })
            .collect();

        let body = serde_json::to_string(&RerankResponse { results }).map_err(|e| {
            FusionError::Protocol {
                model: request.model.clone(),
                message: e.to_string(),
            }
        })?;

        Ok(TransportResponse { status: 200, body })
    }
}
