use thiserror::Error;

/// Malformed boolean query text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error at position {position}: expected {expected}")]
pub struct SyntaxError {
    pub position: usize,
    pub expected: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("embedding dimension mismatch: query has {query}, document {doc_id} has {document}")]
    DimensionMismatch { doc_id: u32, query: usize, document: usize },

    #[error("embedding failed: {0}")]
    Embedding(String),
}

/// Why a single query of a batch produced no result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("store is closed")]
    Closed,
}
