pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod features;
pub mod merge;
pub mod model;
pub mod output;
pub mod rerank;
pub mod sample;
pub mod score;
pub mod search;

// Re-export commonly used types
pub use config::Config;
pub use document::Document;
pub use error::{FusionError, Result};
pub use features::{CandidatePool, FeatureBuilder, FeatureVector, QueryBundle};
pub use merge::{power_mean, ListMerger, MergeCandidate};
pub use model::RelevanceModel;
pub use rerank::{Reranker, RerankerRegistry};
pub use score::{ScoreTable, ScoredDocument};
pub use search::{FusionPipeline, TopKSelector};
