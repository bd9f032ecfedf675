//! Retrieval effectiveness against relevance judgments.
//!
//! All functions are pure. Degenerate inputs (nothing retrieved, nothing
//! relevant) score 0 instead of dividing by zero. A retrieved list may hold the
//! same document more than once; precision counts list entries, recall and
//! average precision count each relevant document once.

use crate::index::DocId;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

lazy_static! {
    static ref EMPTY: HashSet<DocId> = HashSet::new();
}

/// Ground truth: query number -> relevant document ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceJudgments {
    judgments: BTreeMap<u32, HashSet<DocId>>,
}

impl RelevanceJudgments {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, query: u32, doc_id: DocId) {
        self.judgments.entry(query).or_default().insert(doc_id);
    }

    /// Relevant documents for a query; empty when the query has no judgments.
    pub fn relevant(&self, query: u32) -> &HashSet<DocId> {
        self.judgments.get(&query).unwrap_or(&EMPTY)
    }

    pub fn num_queries(&self) -> usize { self.judgments.len() }
    pub fn num_judgments(&self) -> usize { self.judgments.values().map(HashSet::len).sum() }
}

impl FromIterator<(u32, DocId)> for RelevanceJudgments {
    fn from_iter<T: IntoIterator<Item = (u32, DocId)>>(iter: T) -> Self {
        let mut out = Self::new();
        for (q, d) in iter {
            out.insert(q, d);
        }
        out
    }
}

/// Per-query summary handed to reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub query_index: u32,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
    /// Retrieved doc ids in rank order, comma separated.
    pub result: String,
}

impl EvaluationRecord {
    pub fn score(query_index: u32, retrieved: &[DocId], relevant: &HashSet<DocId>) -> Self {
        let precision = precision(retrieved, relevant);
        let recall = recall(retrieved, relevant);
        Self {
            query_index,
            precision,
            recall,
            f_measure: f_measure(precision, recall),
            result: retrieved.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(","),
        }
    }

    /// Record for a query that produced no result.
    pub fn empty(query_index: u32) -> Self {
        Self { query_index, precision: 0.0, recall: 0.0, f_measure: 0.0, result: String::new() }
    }
}

pub fn precision(retrieved: &[DocId], relevant: &HashSet<DocId>) -> f64 {
    if retrieved.is_empty() {
        return 0.0;
    }
    let hits = retrieved.iter().filter(|d| relevant.contains(d)).count();
    hits as f64 / retrieved.len() as f64
}

pub fn recall(retrieved: &[DocId], relevant: &HashSet<DocId>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let found: HashSet<DocId> = retrieved.iter().copied().filter(|d| relevant.contains(d)).collect();
    found.len() as f64 / relevant.len() as f64
}

/// Harmonic mean of precision and recall.
pub fn f_measure(precision: f64, recall: f64) -> f64 {
    if precision == 0.0 && recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

/// Sum of precision@rank at each relevant hit, over the number of relevant documents.
pub fn average_precision(retrieved: &[DocId], relevant: &HashSet<DocId>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let mut seen = HashSet::with_capacity(relevant.len());
    let mut sum = 0.0;
    for (i, doc_id) in retrieved.iter().enumerate() {
        if relevant.contains(doc_id) && seen.insert(*doc_id) {
            sum += seen.len() as f64 / (i + 1) as f64;
        }
    }
    sum / relevant.len() as f64
}

pub fn mean_average_precision(average_precisions: &[f64]) -> f64 {
    if average_precisions.is_empty() {
        return 0.0;
    }
    average_precisions.iter().sum::<f64>() / average_precisions.len() as f64
}
