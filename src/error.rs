use thiserror::Error;

/// Errors surfaced by the fusion and merge entry points
#[derive(Debug, Error)]
pub enum FusionError {
    /// A reranking table has no entry for a document it must contain
    #[error("reranker '{model}' returned no score for document '{document_id}'")]
    MissingScore { model: String, document_id: String },

    /// The reranking collaborator answered with a non-success status
    #[error("reranker '{model}' failed with status {status}: {body}")]
    Transport {
        model: String,
        status: u16,
        body: String,
    },

    /// The reranking collaborator answered with an undecodable body
    #[error("reranker '{model}' returned a malformed response: {message}")]
    Protocol { model: String, message: String },

    #[error("score table for '{model}' is empty")]
    InsufficientData { model: String },

    #[error("top-score mean for '{model}' is zero, relative features are undefined")]
    ZeroNormalizer { model: String },

    #[error("unknown model: '{0}'")]
    UnknownModel(String),

    /// A configured model has no score table in the query bundle
    #[error("no {kind} scores supplied for model '{model}'")]
    MissingTable { kind: &'static str, model: String },

    #[error("score table '{model}' references unknown document '{document_id}'")]
    UnknownDocument { model: String, document_id: String },

    #[error("score table '{model}' lists document '{document_id}' more than once")]
    DuplicateDocument { model: String, document_id: String },

    #[error("reranker '{model}' returned index {index} for {len} documents")]
    RerankIndexOutOfRange {
        model: String,
        index: usize,
        len: usize,
    },

    #[error("feature '{0}' is not produced by the feature builder")]
    UnknownFeature(String),

    #[error("{scores} scores supplied for {candidates} candidates")]
    ScoreCountMismatch { scores: usize, candidates: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("rerank task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, FusionError>;
