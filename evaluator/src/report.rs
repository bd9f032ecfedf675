use anyhow::{Context, Result};
use engine::batch::{BatchSummary, QueryOutcome};
use engine::{EvaluationRecord, InvertedIndex};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const RULE: &str = "--------------------";

/// Ranked hits to print per vector query.
const SHOWN_HITS: usize = 10;

#[derive(Debug, Serialize)]
pub struct QueryFailure {
    pub query_index: u32,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct StrategyReport {
    pub strategy: String,
    pub summary: BatchSummary,
    pub records: Vec<EvaluationRecord>,
    pub failures: Vec<QueryFailure>,
}

impl StrategyReport {
    pub fn new(strategy: &str, outcomes: &[QueryOutcome], summary: BatchSummary) -> Self {
        let failures = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| QueryFailure { query_index: o.query_number, error: e.to_string() }))
            .collect();
        Self {
            strategy: strategy.to_string(),
            summary,
            records: outcomes.iter().map(|o| o.record.clone()).collect(),
            failures,
        }
    }
}

/// Per-query block: hits, precision, recall, F-measure and timing.
pub fn print_outcomes(strategy: &str, outcomes: &[QueryOutcome], summary: &BatchSummary, scored_hits: bool) {
    println!("{RULE} {strategy} {RULE}");
    for outcome in outcomes {
        let q = outcome.query_number;
        println!("Query #{q}");
        match &outcome.result {
            Ok(result) if scored_hits => {
                for hit in result.hits.iter().take(SHOWN_HITS) {
                    println!("{} ---- {:.4}", hit.doc_id, hit.score);
                }
            }
            Ok(result) => println!("{}", result.to_id_list()),
            Err(err) => println!("error: {err}"),
        }
        println!("Precision for query #{q} = {:.4}", outcome.record.precision);
        println!("Re-Call for query #{q} = {:.4}", outcome.record.recall);
        println!("F-Measure for query #{q} = {:.4}", outcome.record.f_measure);
        println!("result in {} ms.", outcome.elapsed.as_millis());
        println!("{RULE}");
    }
    println!("MAP for all queries = {:.4} ({} evaluated, {} failed)", summary.map, summary.evaluated, summary.failed);
}

pub fn write_report(path: &Path, reports: &[StrategyReport]) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(f), reports)?;
    tracing::info!(path = %path.display(), strategies = reports.len(), "wrote evaluation report");
    Ok(())
}

/// `term,total_frequency,id-id-id` per term, terms in lexicographic order.
pub fn write_index_csv(path: &Path, index: &InvertedIndex) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(f);
    write_index_rows(&mut w, index)?;
    w.flush()?;
    tracing::info!(path = %path.display(), num_terms = index.num_terms(), "wrote inverted index csv");
    Ok(())
}

fn write_index_rows<W: Write>(w: &mut W, index: &InvertedIndex) -> Result<()> {
    for (term, postings) in index.first_terms(index.num_terms()) {
        let ids: Vec<String> = postings.doc_ids().map(|d| d.to_string()).collect();
        writeln!(w, "{term},{},{}", postings.total_frequency(), ids.join("-"))?;
    }
    Ok(())
}
