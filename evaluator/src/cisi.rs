//! Readers for the CISI test collection files.
//!
//! `.ALL` holds the documents, `.REL` the relevance judgments, `.BLN` the
//! boolean queries and `.QRY` the free-text queries. Records start with a
//! `.I <n>` line; fields start with `.T`, `.A`, `.W`, `.X` (and `.B` in queries).

use anyhow::{Context, Result};
use engine::batch::Query;
use engine::{DocId, Document, RelevanceJudgments};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

lazy_static! {
    static ref RECORD: Regex = Regex::new(r"(?m)^\.I\s+(\d+)").expect("valid regex");
    static ref TITLE: Regex = Regex::new(r"(?s)\.T\s(.*?)(?:\n\.[A-Z]\s|\z)").expect("valid regex");
    static ref AUTHOR: Regex = Regex::new(r"\n\.A\s(.+)").expect("valid regex");
    static ref CONTENT: Regex = Regex::new(r"(?s)\.W\s(.*?)(?:\n\.X\s|\z)").expect("valid regex");
    static ref EXTRA: Regex = Regex::new(r"\n\.X\s(.+)").expect("valid regex");
    static ref QUERY_TEXT: Regex = Regex::new(r"(?s)\.W\s(.*?)(?:\n\.[A-Z]\s|\z)").expect("valid regex");
    static ref JUDGMENT: Regex = Regex::new(r"(\d+)\s+(\d+)\s+(\d+)\s+(\d+\.\d+)").expect("valid regex");
    static ref BOOLEAN_QUERY: Regex = Regex::new(r"#q\d+=").expect("valid regex");
}

/// Split text at `.I <n>` markers into (record number, record body).
fn records(text: &str) -> Vec<(u32, &str)> {
    let marks: Vec<(u32, usize, usize)> = RECORD
        .captures_iter(text)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let number = c[1].parse().ok()?;
            Some((number, whole.start(), whole.end()))
        })
        .collect();
    marks
        .iter()
        .enumerate()
        .map(|(i, &(number, _, body_start))| {
            let body_end = marks.get(i + 1).map(|m| m.1).unwrap_or(text.len());
            (number, &text[body_start..body_end])
        })
        .collect()
}

fn capture(re: &Regex, text: &str) -> String {
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().trim().to_string()).unwrap_or_default()
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Documents get ids 1.. in file order, whatever their `.I` number says.
pub fn parse_documents(text: &str) -> Vec<Document> {
    let text = text.replace("\r\n", "\n");
    records(&text)
        .into_iter()
        .enumerate()
        .map(|(i, (_, body))| {
            let body = format!("\n{body}");
            Document {
                id: i as DocId + 1,
                title: one_line(&capture(&TITLE, &body)),
                author: capture(&AUTHOR, &body),
                content: capture(&CONTENT, &body),
                extra: capture(&EXTRA, &body),
            }
        })
        .collect()
}

pub fn parse_judgments(text: &str) -> RelevanceJudgments {
    JUDGMENT
        .captures_iter(text)
        .filter_map(|c| Some((c[1].parse::<u32>().ok()?, c[2].parse::<DocId>().ok()?)))
        .collect()
}

/// `#q<n>= expr;` entries, numbered by position.
pub fn parse_boolean_queries(text: &str) -> Vec<Query> {
    let starts: Vec<(usize, usize)> = BOOLEAN_QUERY.find_iter(text).map(|m| (m.start(), m.end())).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &(_, body_start))| {
            let body_end = starts.get(i + 1).map(|s| s.0).unwrap_or(text.len());
            let body = text[body_start..body_end].trim();
            let body = body.rfind(';').map(|p| &body[..p]).unwrap_or(body);
            Query::new(i as u32 + 1, body.trim())
        })
        .collect()
}

pub fn parse_text_queries(text: &str) -> Vec<Query> {
    let text = text.replace("\r\n", "\n");
    records(&text)
        .into_iter()
        .map(|(number, body)| Query::new(number, one_line(&capture(&QUERY_TEXT, body))))
        .collect()
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let docs = parse_documents(&read(path)?);
    tracing::info!(path = %path.display(), num_docs = docs.len(), "parsed corpus");
    Ok(docs)
}

pub fn load_judgments(path: &Path) -> Result<RelevanceJudgments> {
    let judgments = parse_judgments(&read(path)?);
    tracing::info!(path = %path.display(), queries = judgments.num_queries(), judgments = judgments.num_judgments(), "loaded relevance judgments");
    Ok(judgments)
}

pub fn load_boolean_queries(path: &Path) -> Result<Vec<Query>> {
    let queries = parse_boolean_queries(&read(path)?);
    tracing::info!(path = %path.display(), num_queries = queries.len(), "loaded boolean queries");
    Ok(queries)
}

pub fn load_text_queries(path: &Path) -> Result<Vec<Query>> {
    let queries = parse_text_queries(&read(path)?);
    tracing::info!(path = %path.display(), num_queries = queries.len(), "loaded free-text queries");
    Ok(queries)
}

/// Collection files found under a data directory, by extension.
#[derive(Debug, Default, Clone)]
pub struct CollectionFiles {
    pub corpus: Option<PathBuf>,
    pub relevance: Option<PathBuf>,
    pub boolean_queries: Option<PathBuf>,
    pub text_queries: Option<PathBuf>,
}

impl CollectionFiles {
    pub fn discover(dir: &Path) -> Self {
        let mut files = Self::default();
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if !p.is_file() { continue; }
            let ext = p.extension().and_then(|s| s.to_str()).map(|s| s.to_ascii_uppercase());
            let slot = match ext.as_deref() {
                Some("ALL") => &mut files.corpus,
                Some("REL") => &mut files.relevance,
                Some("BLN") => &mut files.boolean_queries,
                Some("QRY") => &mut files.text_queries,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(p.to_path_buf());
            }
        }
        files
    }
}
