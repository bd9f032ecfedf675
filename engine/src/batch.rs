//! Per-query evaluation with an explicit outcome for every query.
//!
//! A query that fails to parse or evaluate still yields a `QueryOutcome`: its
//! error, a zero record, and an average precision of 0 that counts toward MAP.

use crate::analyzer::Analyzer;
use crate::error::QueryError;
use crate::eval::{evaluate, EvalOptions};
use crate::index::{InvertedIndex, RetrievalResult};
use crate::metrics::{average_precision, mean_average_precision, EvaluationRecord, RelevanceJudgments};
use crate::query::parse;
use crate::vector::{EmbeddingProvider, VectorIndex};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub number: u32,
    pub text: String,
}

impl Query {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self { number, text: text.into() }
    }
}

/// Number queries 1.. in the given order.
pub fn number_queries<I, S>(texts: I) -> Vec<Query>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    texts.into_iter().enumerate().map(|(i, t)| Query::new(i as u32 + 1, t)).collect()
}

#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub query_number: u32,
    pub result: Result<RetrievalResult, QueryError>,
    pub record: EvaluationRecord,
    pub average_precision: f64,
    pub elapsed: Duration,
}

impl QueryOutcome {
    pub fn new(
        query_number: u32,
        result: Result<RetrievalResult, QueryError>,
        judgments: &RelevanceJudgments,
        elapsed: Duration,
    ) -> Self {
        let (record, ap) = match &result {
            Ok(r) => {
                let ids = r.doc_ids();
                let relevant = judgments.relevant(query_number);
                (EvaluationRecord::score(query_number, &ids, relevant), average_precision(&ids, relevant))
            }
            Err(err) => {
                tracing::warn!(query = query_number, %err, "query failed");
                (EvaluationRecord::empty(query_number), 0.0)
            }
        };
        Self { query_number, result, record, average_precision: ap, elapsed }
    }

    pub fn is_ok(&self) -> bool { self.result.is_ok() }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub map: f64,
    pub evaluated: usize,
    pub failed: usize,
}

pub fn summarize(outcomes: &[QueryOutcome]) -> BatchSummary {
    let aps: Vec<f64> = outcomes.iter().map(|o| o.average_precision).collect();
    BatchSummary {
        map: mean_average_precision(&aps),
        evaluated: outcomes.len(),
        failed: outcomes.iter().filter(|o| !o.is_ok()).count(),
    }
}

/// Parse and evaluate one boolean query. No match is an empty result, not an error.
pub fn run_boolean_query(
    query: &Query,
    index: &InvertedIndex,
    analyzer: &dyn Analyzer,
    judgments: &RelevanceJudgments,
    options: EvalOptions,
) -> QueryOutcome {
    let start = Instant::now();
    let result = parse(&query.text)
        .map_err(QueryError::from)
        .and_then(|node| evaluate(&node, index, analyzer, options).map_err(QueryError::from))
        .map(|postings| postings.map(|p| RetrievalResult::from_postings(&p)).unwrap_or_default());
    let outcome = QueryOutcome::new(query.number, result, judgments, start.elapsed());
    tracing::debug!(query = query.number, ok = outcome.is_ok(), elapsed_ms = outcome.elapsed.as_millis() as u64, "boolean query");
    outcome
}

pub fn run_boolean(
    queries: &[Query],
    index: &InvertedIndex,
    analyzer: &dyn Analyzer,
    judgments: &RelevanceJudgments,
    options: EvalOptions,
) -> Vec<QueryOutcome> {
    queries.iter().map(|q| run_boolean_query(q, index, analyzer, judgments, options)).collect()
}

/// Rank the corpus for one free-text query; `cutoff` keeps only the top hits.
pub fn run_vector_query(
    query: &Query,
    vectors: &VectorIndex,
    provider: &dyn EmbeddingProvider,
    judgments: &RelevanceJudgments,
    cutoff: Option<usize>,
) -> QueryOutcome {
    let start = Instant::now();
    let result = vectors
        .search(&query.text, provider)
        .map(|mut r| {
            if let Some(k) = cutoff {
                r.hits.truncate(k);
            }
            r
        })
        .map_err(QueryError::from);
    let outcome = QueryOutcome::new(query.number, result, judgments, start.elapsed());
    tracing::debug!(query = query.number, ok = outcome.is_ok(), elapsed_ms = outcome.elapsed.as_millis() as u64, "vector query");
    outcome
}

pub fn run_vector(
    queries: &[Query],
    vectors: &VectorIndex,
    provider: &dyn EmbeddingProvider,
    judgments: &RelevanceJudgments,
    cutoff: Option<usize>,
) -> Vec<QueryOutcome> {
    queries.iter().map(|q| run_vector_query(q, vectors, provider, judgments, cutoff)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::StandardAnalyzer;
    use crate::error::SyntaxError;
    use crate::index::Document;

    fn docs() -> Vec<Document> {
        ["library catalog", "catalog systems", "retrieval systems"]
            .iter()
            .enumerate()
            .map(|(i, c)| Document { id: i as u32 + 1, content: c.to_string(), ..Default::default() })
            .collect()
    }

    #[test]
    fn failed_query_does_not_stop_the_batch() {
        let index = InvertedIndex::build(&docs(), &StandardAnalyzer);
        let judgments: RelevanceJudgments = [(1, 1), (1, 2), (2, 3), (3, 2)].into_iter().collect();
        let queries = number_queries(["#or('catalog','retrieval')", "#and('systems'", "'systems'"]);

        let outcomes = run_boolean(&queries, &index, &StandardAnalyzer, &judgments, EvalOptions::default());
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].result.as_ref().unwrap().doc_ids(), vec![1, 2, 3]);
        assert!(matches!(outcomes[1].result, Err(QueryError::Syntax(SyntaxError { .. }))));
        assert_eq!(outcomes[1].record, EvaluationRecord::empty(2));
        assert_eq!(outcomes[2].record.result, "2,3");

        let summary = summarize(&outcomes);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.evaluated, 3);
        // q1: AP 1.0, q2: 0, q3: relevant doc 2 at rank 1 -> 1.0
        assert!((summary.map - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn deeply_nested_query_fails_alone() {
        let index = InvertedIndex::build(&docs(), &StandardAnalyzer);
        let deep = format!("{}'systems'{}", "#and(".repeat(200_000), ")".repeat(200_000));
        let queries = vec![Query::new(1, deep), Query::new(2, "'systems'")];

        let outcomes = run_boolean(&queries, &index, &StandardAnalyzer, &RelevanceJudgments::new(), EvalOptions::default());
        assert!(matches!(&outcomes[0].result, Err(QueryError::Syntax(e)) if e.expected == "shallower nesting"));
        assert_eq!(outcomes[1].result.as_ref().unwrap().doc_ids(), vec![2, 3]);
    }

    #[test]
    fn unmatched_query_is_an_empty_success() {
        let index = InvertedIndex::build(&docs(), &StandardAnalyzer);
        let outcome = run_boolean_query(&Query::new(4, "'zebra'"), &index, &StandardAnalyzer, &RelevanceJudgments::new(), EvalOptions::default());
        assert!(outcome.is_ok());
        assert!(outcome.result.unwrap().is_empty());
        assert_eq!(outcome.record.precision, 0.0);
    }
}
