use crate::document::{round6, Document};
use crate::error::{FusionError, Result};
use crate::features::CandidatePool;

/// Picks the highest-probability documents
#[derive(Debug, Clone)]
pub struct TopKSelector {
    k: usize,
}

impl TopKSelector {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Top `k` candidates by probability, scores rounded to 6 digits.
    ///
    /// `probabilities[i]` belongs to the i-th candidate in pool order. Equal
    /// probabilities keep pool order. Returned documents are copies.
    pub fn select(&self, pool: &CandidatePool, probabilities: &[f64]) -> Result<Vec<Document>> {
        if probabilities.len() != pool.len() {
            return Err(FusionError::ScoreCountMismatch {
                scores: probabilities.len(),
                candidates: pool.len(),
            });
        }

        let mut ranked: Vec<(usize, f64)> = probabilities.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(self.k);

        let ids = pool.ids();
        Ok(ranked
            .into_iter()
            .filter_map(|(idx, p)| pool.get(&ids[idx]).map(|doc| doc.with_score(round6(p))))
            .collect())
    }
}
