use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};

/// Number of leading entries averaged for per-model normalisation
pub const TOP_MEAN_DEPTH: usize = 3;

/// One document's score from one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document_id: String,
    pub score: f64,
}

impl ScoredDocument {
    pub fn new(document_id: impl Into<String>, score: f64) -> Self {
        Self {
            document_id: document_id.into(),
            score,
        }
    }
}

/// Scores a single model assigned to a query's candidates, best first
#[derive(Debug, Clone)]
pub struct ScoreTable {
    model: String,
    entries: Vec<ScoredDocument>,
    positions: HashMap<String, usize>,
}

impl ScoreTable {
    /// Build a table, ordering entries by descending score.
    ///
    /// The sort is stable, so input already ranked by the model keeps its
    /// order. Document ids must be unique.
    pub fn new(model: impl Into<String>, mut entries: Vec<ScoredDocument>) -> Result<Self> {
        let model = model.into();
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut positions = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            if positions.insert(entry.document_id.clone(), idx).is_some() {
                return Err(FusionError::DuplicateDocument {
                    model,
                    document_id: entry.document_id.clone(),
                });
            }
        }

        Ok(Self {
            model,
            entries,
            positions,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn entries(&self) -> &[ScoredDocument] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, document_id: &str) -> Option<f64> {
        self.positions
            .get(document_id)
            .map(|&idx| self.entries[idx].score)
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.positions.contains_key(document_id)
    }

    /// Score of the weakest ranked entry, used as the fallback for
    /// documents this model did not score
    pub fn lowest(&self) -> Result<f64> {
        self.entries
            .last()
            .map(|e| e.score)
            .ok_or_else(|| FusionError::InsufficientData {
                model: self.model.clone(),
            })
    }

    /// Mean of the top [`TOP_MEAN_DEPTH`] scores.
    ///
    /// Tables shorter than that are averaged over what they hold.
    pub fn top_mean(&self) -> Result<f64> {
        let top = &self.entries[..self.entries.len().min(TOP_MEAN_DEPTH)];
        if top.is_empty() {
            return Err(FusionError::InsufficientData {
                model: self.model.clone(),
            });
        }
        Ok(top.iter().map(|e| e.score).sum::<f64>() / top.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(scores: &[(&str, f64)]) -> ScoreTable {
        ScoreTable::new(
            "bge",
            scores
                .iter()
                .map(|(id, s)| ScoredDocument::new(*id, *s))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_orders_descending() {
        let t = table(&[("a", 0.2), ("b", 0.9), ("c", 0.5)]);
        let ids: Vec<_> = t.entries().iter().map(|e| e.document_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(t.lowest().unwrap(), 0.2);
    }

    #[test]
    fn test_stable_on_equal_scores() {
        let t = table(&[("x", 0.5), ("y", 0.5), ("z", 0.5)]);
        let ids: Vec<_> = t.entries().iter().map(|e| e.document_id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_top_mean_of_exactly_three() {
        let t = table(&[("a", 0.9), ("b", 0.6), ("c", 0.3)]);
        assert!((t.top_mean().unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(t.lowest().unwrap(), 0.3);
    }

    #[test]
    fn test_top_mean_ignores_tail() {
        let t = table(&[("a", 0.9), ("b", 0.8), ("c", 0.7), ("d", 0.0)]);
        assert!((t.top_mean().unwrap() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_short_table_averages_available_entries() {
        let t = table(&[("a", 0.9), ("b", 0.5)]);
        assert!((t.top_mean().unwrap() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_empty_table_is_insufficient() {
        let t = ScoreTable::new("bge", vec![]).unwrap();
        assert!(matches!(t.top_mean(), Err(FusionError::InsufficientData { .. })));
        assert!(matches!(t.lowest(), Err(FusionError::InsufficientData { .. })));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = ScoreTable::new(
            "bge",
            vec![ScoredDocument::new("a", 0.4), ScoredDocument::new("a", 0.3)],
        );
        assert!(matches!(result, Err(FusionError::DuplicateDocument { .. })));
    }

    #[test]
    fn test_lookup() {
        let t = table(&[("a", 0.9), ("b", 0.5)]);
        assert_eq!(t.get("b"), Some(0.5));
        assert_eq!(t.get("missing"), None);
        assert!(t.contains("a"));
    }
}
