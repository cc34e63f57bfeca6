//! Two-list rank merging with a generalized power mean
//!
//! Each document in the union of both lists gets one score per side (the
//! list's last score when the document is absent from it) and the pair is
//! combined with [`power_mean`]. For exponents above 1 the combination leans
//! toward the larger score.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::MergeConfig;
use crate::document::Document;

/// Default number of merged documents returned
pub const DEFAULT_MERGE_TOP_K: usize = 5;

/// Default power-mean exponent
pub const DEFAULT_EXPONENT: f64 = 2.0;

/// `(x^p + y^p) / (x^(p-1) + y^(p-1))`
///
/// Evaluated relative to `max(x, y)` so large exponents converge to the
/// maximum instead of underflowing to `0/0`. Inputs must be non-negative.
/// Two zero inputs combine to zero.
pub fn power_mean(x: f64, y: f64, p: f64) -> f64 {
    let m = x.max(y);
    if m == 0.0 {
        return 0.0;
    }
    let (a, b) = (x / m, y / m);
    m * (a.powf(p) + b.powf(p)) / (a.powf(p - 1.0) + b.powf(p - 1.0))
}

/// A document with its per-list scores and their combination
#[derive(Debug, Clone, PartialEq)]
pub struct MergeCandidate {
    pub document: Document,
    pub first_score: f64,
    pub second_score: f64,
    pub fused_score: f64,
}

#[derive(Debug, Clone)]
pub struct ListMerger {
    top_k: usize,
    exponent: f64,
}

impl Default for ListMerger {
    fn default() -> Self {
        Self::new(DEFAULT_MERGE_TOP_K, DEFAULT_EXPONENT)
    }
}

impl ListMerger {
    pub fn new(top_k: usize, exponent: f64) -> Self {
        Self { top_k, exponent }
    }

    pub fn from_config(config: &MergeConfig) -> Self {
        Self::new(config.top_k, config.exponent)
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    /// Every document in either list, fused and sorted best first.
    ///
    /// Ties keep first-seen order: ids from `first` in rank order, then ids
    /// only `second` holds.
    pub fn candidates(&self, first: &[Document], second: &[Document]) -> Vec<MergeCandidate> {
        let first_map = index_by_id(first);
        let second_map = index_by_id(second);

        let first_fallback = first.last().map(Document::score).unwrap_or(0.0);
        let second_fallback = second.last().map(Document::score).unwrap_or(0.0);

        let mut seen = HashSet::with_capacity(first_map.len() + second_map.len());
        let union: Vec<String> = first
            .iter()
            .chain(second.iter())
            .map(Document::segment_id)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut merged: Vec<MergeCandidate> = union
            .iter()
            .filter_map(|id| {
                let in_first = first_map.get(id.as_str()).copied();
                let in_second = second_map.get(id.as_str()).copied();

                let first_score = in_first.map(Document::score).unwrap_or(first_fallback);
                let second_score = in_second.map(Document::score).unwrap_or(second_fallback);
                let fused_score = power_mean(first_score, second_score, self.exponent);

                in_first.or(in_second).map(|base| MergeCandidate {
                    document: base.with_score(fused_score),
                    first_score,
                    second_score,
                    fused_score,
                })
            })
            .collect();

        merged.sort_by(|a, b| b.fused_score.total_cmp(&a.fused_score));
        merged
    }

    /// Top-K fused documents, each carrying its fused score
    pub fn merge(&self, first: &[Document], second: &[Document]) -> Vec<Document> {
        let mut merged = self.candidates(first, second);
        debug!(
            "Merged {} + {} documents into {} candidates (p = {})",
            first.len(),
            second.len(),
            merged.len(),
            self.exponent
        );
        merged.truncate(self.top_k);
        merged.into_iter().map(|c| c.document).collect()
    }
}

/// Later duplicates of an id replace earlier ones
fn index_by_id(documents: &[Document]) -> HashMap<String, &Document> {
    documents.iter().map(|d| (d.segment_id(), d)).collect()
}
