//! Dense-vector ranking by cosine similarity.

use crate::error::EvalError;
use crate::index::{DocId, Document, Hit, RetrievalResult};
use serde::{Deserialize, Serialize};

/// Turns text into a fixed-length vector. Every call on one provider must
/// return the same dimensionality.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EvalError>;
    fn dimension(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEmbedding {
    pub doc_id: DocId,
    pub vector: Vec<f32>,
}

/// Cosine similarity, defined as 0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    dot / denom
}

/// Embeddings for a whole corpus, kept in corpus order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    embeddings: Vec<DocumentEmbedding>,
}

impl VectorIndex {
    pub fn new(embeddings: Vec<DocumentEmbedding>) -> Self { Self { embeddings } }

    /// Embed the content field of every document.
    pub fn build(documents: &[Document], provider: &dyn EmbeddingProvider) -> Result<Self, EvalError> {
        let mut embeddings = Vec::with_capacity(documents.len());
        for doc in documents {
            embeddings.push(DocumentEmbedding { doc_id: doc.id, vector: provider.embed(&doc.content)? });
        }
        tracing::debug!(num_docs = embeddings.len(), dimension = provider.dimension(), "embedded corpus");
        Ok(Self { embeddings })
    }

    pub fn len(&self) -> usize { self.embeddings.len() }
    pub fn is_empty(&self) -> bool { self.embeddings.is_empty() }
    pub fn embeddings(&self) -> &[DocumentEmbedding] { &self.embeddings }

    /// Rank every document against the query text.
    pub fn search(&self, query: &str, provider: &dyn EmbeddingProvider) -> Result<RetrievalResult, EvalError> {
        let query_vector = provider.embed(query)?;
        self.search_vector(&query_vector)
    }

    /// Descending similarity; equal scores keep corpus order.
    pub fn search_vector(&self, query: &[f32]) -> Result<RetrievalResult, EvalError> {
        let mut hits = Vec::with_capacity(self.embeddings.len());
        for emb in &self.embeddings {
            if emb.vector.len() != query.len() {
                return Err(EvalError::DimensionMismatch { doc_id: emb.doc_id, query: query.len(), document: emb.vector.len() });
            }
            hits.push(Hit { doc_id: emb.doc_id, score: cosine_similarity(query, &emb.vector) });
        }
        // sort_by is stable
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(RetrievalResult { hits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn cosine_identities() {
        let v = [0.3f32, -1.2, 4.0];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < EPS);
        assert!((cosine_similarity(&v, &neg) + 1.0).abs() < EPS);
        assert_eq!(cosine_similarity(&[0.0; 3], &v), 0.0);
        assert_eq!(cosine_similarity(&[0.0; 3], &[0.0; 3]), 0.0);
    }

    #[test]
    fn ranks_descending_with_stable_ties() {
        let index = VectorIndex::new(vec![
            DocumentEmbedding { doc_id: 7, vector: vec![0.0, 1.0] },
            DocumentEmbedding { doc_id: 3, vector: vec![1.0, 0.0] },
            DocumentEmbedding { doc_id: 5, vector: vec![0.0, 2.0] },
            DocumentEmbedding { doc_id: 1, vector: vec![1.0, 1.0] },
        ]);
        let result = index.search_vector(&[0.0, 1.0]).unwrap();
        assert_eq!(result.doc_ids(), vec![7, 5, 1, 3]);
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let index = VectorIndex::new(vec![DocumentEmbedding { doc_id: 1, vector: vec![1.0, 0.0, 0.0] }]);
        let err = index.search_vector(&[1.0, 0.0]).unwrap_err();
        assert_eq!(err, EvalError::DimensionMismatch { doc_id: 1, query: 2, document: 3 });
    }
}
