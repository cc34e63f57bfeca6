//! Deterministic document lists for demos, tests and benchmarks

use crate::document::{round6, Document};

/// `n` retrieval results scored `0.2 + (n - i) / (10 n)`, two segments per title
pub fn retrieval_results(prefix: &str, n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            Document::new(
                format!("{prefix}-title-{}", i / 2),
                format!("{prefix} content {i}"),
                i as u64,
                0.2 + (n - i) as f64 / (n as f64 * 10.0),
            )
        })
        .collect()
}

/// `n` results starting at `start_score` and dropping 0.01 per rank
pub fn ranked_list(prefix: &str, n: usize, start_score: f64) -> Vec<Document> {
    (0..n)
        .map(|i| {
            Document::new(
                format!("{prefix}-title-{}", i / 2),
                format!("{prefix} content {i}"),
                i as u64,
                round6(start_score - i as f64 * 0.01),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_results_descend() {
        let docs = retrieval_results("bge", 24);
        assert_eq!(docs.len(), 24);
        assert_eq!(docs[3].segment_id(), "bge-title-1-3");
        assert!((docs[0].score() - 0.3).abs() < 1e-12);
        for pair in docs.windows(2) {
            assert!(pair[0].score() > pair[1].score());
        }
    }

    #[test]
    fn test_ranked_list_scores() {
        let docs = ranked_list("A", 7, 0.95);
        assert_eq!(docs[0].score(), 0.95);
        assert_eq!(docs[6].score(), 0.89);
    }
}
