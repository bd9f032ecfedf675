//! Set algebra over posting lists.

use crate::analyzer::Analyzer;
use crate::error::EvalError;
use crate::index::{DocId, InvertedIndex, Posting};
use crate::query::{Operator, QueryNode};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// How `#or` combines its operands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrMode {
    /// Operand lists appended in order, duplicates kept.
    #[default]
    Concatenate,
    /// Sorted union by doc_id; frequencies of shared documents are summed.
    Union,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalOptions {
    pub or_mode: OrMode,
}

/// Evaluate a parsed query against the index.
///
/// `Ok(None)` means "no match" (unknown term, term analyzed away, `#and` with
/// no matching operands) and such operands are skipped by the enclosing
/// operator. `Ok(Some(empty))` is a real empty set, e.g. a disjoint `#and`.
pub fn evaluate(
    node: &QueryNode,
    index: &InvertedIndex,
    analyzer: &dyn Analyzer,
    options: EvalOptions,
) -> Result<Option<Vec<Posting>>, EvalError> {
    Ok(evaluate_node(node, index, analyzer, options)?.map(Cow::into_owned))
}

fn evaluate_node<'a>(
    node: &QueryNode,
    index: &'a InvertedIndex,
    analyzer: &dyn Analyzer,
    options: EvalOptions,
) -> Result<Option<Cow<'a, [Posting]>>, EvalError> {
    match node {
        QueryNode::Term(text) => Ok(lookup_term(text, index, analyzer).map(Cow::Borrowed)),
        QueryNode::Logical { op, operands } => {
            let mut lists = Vec::with_capacity(operands.len());
            for operand in operands {
                if let Some(list) = evaluate_node(operand, index, analyzer, options)? {
                    lists.push(list);
                }
            }
            let combined = match op {
                Operator::And => intersect_all(&lists),
                Operator::Or => Some(match options.or_mode {
                    OrMode::Concatenate => concatenate(&lists),
                    OrMode::Union => union_all(&lists),
                }),
                Operator::Not => Some(complement(&union_all(&lists), index.doc_ids())),
                Operator::Unknown(lit) => return Err(EvalError::UnsupportedOperator(lit.clone())),
            };
            Ok(combined.map(Cow::Owned))
        }
    }
}

/// Only the first analyzed token of the raw term text is looked up.
fn lookup_term<'a>(text: &str, index: &'a InvertedIndex, analyzer: &dyn Analyzer) -> Option<&'a [Posting]> {
    let terms = analyzer.analyze("term", text);
    let term = terms.first()?;
    index.postings(term).map(|p| p.as_slice())
}

fn intersect_all<L: AsRef<[Posting]>>(lists: &[L]) -> Option<Vec<Posting>> {
    let (first, rest) = lists.split_first()?;
    let mut acc = first.as_ref().to_vec();
    for list in rest {
        acc = intersect(&acc, list.as_ref());
    }
    Some(acc)
}

/// Two-pointer merge of two sorted lists; keeps the left posting on a match.
pub fn intersect(a: &[Posting], b: &[Posting]) -> Vec<Posting> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    while i < a.len() && j < b.len() {
        if a[i].doc_id == b[j].doc_id {
            out.push(a[i]);
            i += 1;
            j += 1;
        } else if a[i].doc_id < b[j].doc_id {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

pub fn concatenate<L: AsRef<[Posting]>>(lists: &[L]) -> Vec<Posting> {
    let mut out = Vec::with_capacity(lists.iter().map(|l| l.as_ref().len()).sum());
    for list in lists {
        out.extend_from_slice(list.as_ref());
    }
    out
}

pub fn union_all<L: AsRef<[Posting]>>(lists: &[L]) -> Vec<Posting> {
    let mut acc: Vec<Posting> = Vec::new();
    for list in lists {
        acc = union(&acc, list.as_ref());
    }
    acc
}

/// Sorted merge of two sorted lists, summing frequencies of shared documents.
pub fn union(a: &[Posting], b: &[Posting]) -> Vec<Posting> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::with_capacity(a.len() + b.len());
    while i < a.len() && j < b.len() {
        if a[i].doc_id == b[j].doc_id {
            out.push(Posting { doc_id: a[i].doc_id, frequency: a[i].frequency + b[j].frequency });
            i += 1;
            j += 1;
        } else if a[i].doc_id < b[j].doc_id {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Every document of `universe` not in `excluded`, with frequency 1.
pub fn complement(excluded: &[Posting], universe: &[DocId]) -> Vec<Posting> {
    let mut out = Vec::with_capacity(universe.len().saturating_sub(excluded.len()));
    let mut j = 0;
    for &doc_id in universe {
        while j < excluded.len() && excluded[j].doc_id < doc_id {
            j += 1;
        }
        if j < excluded.len() && excluded[j].doc_id == doc_id {
            continue;
        }
        out.push(Posting { doc_id, frequency: 1 });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Document, InvertedIndex};
    use crate::query::parse;

    struct Whitespace;
    impl Analyzer for Whitespace {
        fn analyze(&self, _field: &str, text: &str) -> Vec<String> {
            text.split_whitespace().map(|t| t.to_lowercase()).collect()
        }
    }

    fn p(ids: &[u32]) -> Vec<Posting> {
        ids.iter().map(|&doc_id| Posting { doc_id, frequency: 1 }).collect()
    }

    fn ids(postings: &[Posting]) -> Vec<u32> {
        postings.iter().map(|p| p.doc_id).collect()
    }

    fn index() -> InvertedIndex {
        let docs = [
            (1, "alpha beta"),
            (2, "beta gamma"),
            (3, "alpha gamma gamma"),
            (4, "delta"),
        ];
        let docs: Vec<Document> = docs
            .iter()
            .map(|(id, c)| Document { id: *id, content: c.to_string(), ..Default::default() })
            .collect();
        InvertedIndex::build(&docs, &Whitespace)
    }

    fn run(q: &str, options: EvalOptions) -> Option<Vec<u32>> {
        let node = parse(q).unwrap();
        evaluate(&node, &index(), &Whitespace, options).unwrap().map(|r| ids(&r))
    }

    #[test]
    fn intersect_is_exact_sorted_intersection() {
        let a = p(&[1, 3, 5]);
        let b = p(&[3, 5, 7]);
        assert_eq!(ids(&intersect(&a, &b)), vec![3, 5]);
    }

    #[test]
    fn concatenate_keeps_duplicates() {
        let a = p(&[1, 3]);
        let b = p(&[3, 4, 9]);
        let out = concatenate(&[a.clone(), b.clone()]);
        assert_eq!(out.len(), a.len() + b.len());
        assert_eq!(ids(&out), vec![1, 3, 3, 4, 9]);
    }

    #[test]
    fn union_dedups_and_sums() {
        let a = vec![Posting { doc_id: 1, frequency: 2 }, Posting { doc_id: 3, frequency: 1 }];
        let b = vec![Posting { doc_id: 3, frequency: 4 }];
        assert_eq!(union(&a, &b), vec![Posting { doc_id: 1, frequency: 2 }, Posting { doc_id: 3, frequency: 5 }]);
    }

    #[test]
    fn term_is_reanalyzed() {
        assert_eq!(run("'GAMMA'", EvalOptions::default()), Some(vec![2, 3]));
        assert_eq!(run("'missing'", EvalOptions::default()), None);
        assert_eq!(run("'  '", EvalOptions::default()), None);
    }

    #[test]
    fn and_or_over_index() {
        assert_eq!(run("#and('alpha','gamma')", EvalOptions::default()), Some(vec![3]));
        assert_eq!(run("#and('alpha','delta')", EvalOptions::default()), Some(vec![]));
        assert_eq!(run("#or('alpha','gamma')", EvalOptions::default()), Some(vec![1, 3, 2, 3]));
        let union = EvalOptions { or_mode: OrMode::Union };
        assert_eq!(run("#or('alpha','gamma')", union), Some(vec![1, 2, 3]));
    }

    #[test]
    fn missing_operands_are_skipped() {
        assert_eq!(run("#and('alpha','nowhere')", EvalOptions::default()), Some(vec![1, 3]));
        assert_eq!(run("#and('nowhere')", EvalOptions::default()), None);
        assert_eq!(run("#or('nowhere')", EvalOptions::default()), Some(vec![]));
    }

    #[test]
    fn not_is_complement_of_operands() {
        assert_eq!(run("#not('alpha')", EvalOptions::default()), Some(vec![2, 4]));
        assert_eq!(run("#not('alpha','delta')", EvalOptions::default()), Some(vec![2]));
        assert_eq!(run("#and('gamma',#not('alpha'))", EvalOptions::default()), Some(vec![2]));
    }

    #[test]
    fn unknown_operator_is_an_error() {
        let node = parse("#near('alpha')").unwrap();
        let err = evaluate(&node, &index(), &Whitespace, EvalOptions::default()).unwrap_err();
        assert_eq!(err, EvalError::UnsupportedOperator("near".into()));
    }
}
