//! Fixed-weight logistic relevance model

use crate::config::ModelParams;
use crate::error::{FusionError, Result};
use crate::features::FeatureVector;

/// Linear model over a named feature subset with a logistic link.
///
/// Parameters are supplied already trained and never change.
#[derive(Debug, Clone)]
pub struct RelevanceModel {
    feature_names: Vec<String>,
    weights: Vec<f64>,
    bias: f64,
}

impl RelevanceModel {
    pub fn new(feature_names: Vec<String>, weights: Vec<f64>, bias: f64) -> Result<Self> {
        if feature_names.len() != weights.len() {
            return Err(FusionError::InvalidConfig(format!(
                "{} feature names but {} weights",
                feature_names.len(),
                weights.len()
            )));
        }
        if feature_names.is_empty() {
            return Err(FusionError::InvalidConfig(
                "relevance model needs at least one feature".to_string(),
            ));
        }
        Ok(Self {
            feature_names,
            weights,
            bias,
        })
    }

    pub fn from_params(params: &ModelParams) -> Result<Self> {
        Self::new(params.feature_names.clone(), params.weights.clone(), params.bias)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Linear score `w · x + b` over the selected features
    pub fn logit(&self, features: &FeatureVector) -> Result<f64> {
        let mut z = self.bias;
        for (name, weight) in self.feature_names.iter().zip(&self.weights) {
            let value = features
                .get(name)
                .ok_or_else(|| FusionError::UnknownFeature(name.clone()))?;
            z += value * weight;
        }
        Ok(z)
    }

    /// Relevance probability in (0, 1)
    pub fn predict(&self, features: &FeatureVector) -> Result<f64> {
        self.logit(features).map(sigmoid)
    }

    pub fn predict_all(&self, vectors: &[FeatureVector]) -> Result<Vec<f64>> {
        vectors.iter().map(|v| self.predict(v)).collect()
    }
}

/// Logistic function that never evaluates `exp` of a large positive number
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::features::{CandidatePool, FeatureBuilder, QueryBundle};
    use crate::score::{ScoreTable, ScoredDocument};

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_sigmoid_extremes_stay_finite() {
        assert_eq!(sigmoid(1_000.0), 1.0);
        assert_eq!(sigmoid(-1_000.0), 0.0);
        assert!(sigmoid(f64::MAX).is_finite());
        assert!(sigmoid(f64::MIN).is_finite());
    }

    #[test]
    fn test_sigmoid_symmetry() {
        for z in [-30.0, -2.5, -0.1, 0.1, 2.5, 30.0] {
            assert!((sigmoid(z) + sigmoid(-z) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = RelevanceModel::new(vec!["a".into(), "b".into()], vec![1.0], 0.0);
        assert!(matches!(result, Err(FusionError::InvalidConfig(_))));
    }

    fn zero_vector() -> FeatureVector {
        let mut pool = CandidatePool::new();
        pool.insert(Document::new("z", "", 0, 0.0));
        // Relative features need a non-zero normaliser, so give the table a
        // second, positive entry and score the zero document against it.
        pool.insert(Document::new("p", "", 0, 0.0));
        let emb = ScoreTable::new(
            "m",
            vec![ScoredDocument::new("p-0", 1.0), ScoredDocument::new("z-0", 0.0)],
        )
        .unwrap();
        let bundle = QueryBundle::new(pool, vec![emb], vec![]).unwrap();
        FeatureBuilder::new(vec!["m".into()], vec![])
            .build(&bundle)
            .unwrap()
            .remove(0)
    }

    #[test]
    fn test_zero_features_yield_sigmoid_of_bias() {
        let features = zero_vector();
        assert_eq!(features.get("emb_sim_m"), Some(0.0));
        assert_eq!(features.get("emb_relative_m"), Some(0.0));

        let bias = -1.7;
        let model = RelevanceModel::new(
            vec!["emb_sim_m".into(), "emb_relative_m".into()],
            vec![3.0, -4.0],
            bias,
        )
        .unwrap();
        assert!((model.predict(&features).unwrap() - sigmoid(bias)).abs() < 1e-15);
    }

    #[test]
    fn test_unknown_feature_reported() {
        let model = RelevanceModel::new(vec!["rerank_sim_nope".into()], vec![1.0], 0.0).unwrap();
        let err = model.predict(&zero_vector()).unwrap_err();
        assert!(matches!(err, FusionError::UnknownFeature(name) if name == "rerank_sim_nope"));
    }
}
