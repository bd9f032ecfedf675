pub mod analyzer;
pub mod batch;
pub mod embed;
pub mod error;
pub mod eval;
pub mod index;
pub mod metrics;
pub mod persist;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod vector;

pub use analyzer::{Analyzer, StandardAnalyzer};
pub use error::{EvalError, QueryError, StoreError, SyntaxError};
pub use index::{DocId, Document, Hit, InvertedIndex, Posting, PostingList, RetrievalResult, TokenizedDocument};
pub use metrics::{EvaluationRecord, RelevanceJudgments};
pub use query::{Operator, QueryNode};
pub use vector::{DocumentEmbedding, EmbeddingProvider, VectorIndex};
