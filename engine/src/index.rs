use crate::analyzer::Analyzer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocId = u32;

/// Fields analyzed into the index, in the order they are fed to the builder.
pub const INDEXED_FIELDS: [&str; 2] = ["content", "title"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub author: String,
    pub content: String,
    pub extra: String,
}

/// Analyzed terms of one document, per indexed field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedDocument {
    pub doc_id: DocId,
    pub content_tokens: Vec<String>,
    pub title_tokens: Vec<String>,
}

impl TokenizedDocument {
    pub fn analyze(doc: &Document, analyzer: &dyn Analyzer) -> Self {
        Self {
            doc_id: doc.id,
            content_tokens: analyzer.analyze(INDEXED_FIELDS[0], &doc.content),
            title_tokens: analyzer.analyze(INDEXED_FIELDS[1], &doc.title),
        }
    }

    /// All terms in indexed field order.
    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.content_tokens.iter().chain(self.title_tokens.iter()).map(String::as_str)
    }
}

pub fn tokenize_documents(documents: &[Document], analyzer: &dyn Analyzer) -> Vec<TokenizedDocument> {
    documents.iter().map(|d| TokenizedDocument::analyze(d, analyzer)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub frequency: u32, // occurrences across all indexed fields
}

/// Postings of one term, strictly ascending and unique by doc_id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self { Self::default() }

    /// Wraps postings that the caller guarantees are sorted and unique.
    pub fn from_sorted(postings: Vec<Posting>) -> Self {
        debug_assert!(postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id));
        Self { postings }
    }

    /// Count one occurrence for `doc_id`, inserting in order if it is new.
    pub fn record(&mut self, doc_id: DocId) {
        if let Some(last) = self.postings.last_mut() {
            if last.doc_id == doc_id {
                last.frequency += 1;
                return;
            }
            if last.doc_id < doc_id {
                self.postings.push(Posting { doc_id, frequency: 1 });
                return;
            }
        }
        match self.postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(i) => self.postings[i].frequency += 1,
            Err(i) => self.postings.insert(i, Posting { doc_id, frequency: 1 }),
        }
    }

    pub fn as_slice(&self) -> &[Posting] { &self.postings }
    pub fn len(&self) -> usize { self.postings.len() }
    pub fn is_empty(&self) -> bool { self.postings.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, Posting> { self.postings.iter() }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.postings.iter().map(|p| p.doc_id)
    }

    /// Total occurrences of the term in the collection.
    pub fn total_frequency(&self) -> u64 {
        self.postings.iter().map(|p| p.frequency as u64).sum()
    }
}

impl<'a> IntoIterator for &'a PostingList {
    type Item = &'a Posting;
    type IntoIter = std::slice::Iter<'a, Posting>;
    fn into_iter(self) -> Self::IntoIter { self.postings.iter() }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    terms: HashMap<String, PostingList>,
    doc_ids: Vec<DocId>, // every indexed document, sorted
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Analyze and index a corpus in one step.
    pub fn build(documents: &[Document], analyzer: &dyn Analyzer) -> Self {
        Self::from_tokens(&tokenize_documents(documents, analyzer))
    }

    pub fn from_tokens(tokens: &[TokenizedDocument]) -> Self {
        let mut index = Self::new();
        for doc in tokens {
            index.add_document(doc);
        }
        tracing::debug!(num_docs = index.num_docs(), num_terms = index.num_terms(), "built inverted index");
        index
    }

    /// Postings stay ordered even when documents arrive out of id order.
    pub fn add_document(&mut self, doc: &TokenizedDocument) {
        if let Err(i) = self.doc_ids.binary_search(&doc.doc_id) {
            self.doc_ids.insert(i, doc.doc_id);
        }
        for term in doc.terms() {
            match self.terms.get_mut(term) {
                Some(list) => list.record(doc.doc_id),
                None => {
                    let mut list = PostingList::new();
                    list.record(doc.doc_id);
                    self.terms.insert(term.to_string(), list);
                }
            }
        }
    }

    pub fn postings(&self, term: &str) -> Option<&PostingList> { self.terms.get(term) }
    pub fn num_terms(&self) -> usize { self.terms.len() }
    pub fn num_docs(&self) -> usize { self.doc_ids.len() }
    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
    pub fn doc_ids(&self) -> &[DocId] { &self.doc_ids }

    pub fn collection_frequency(&self, term: &str) -> u64 {
        self.terms.get(term).map(PostingList::total_frequency).unwrap_or(0)
    }

    /// The first `n` terms in lexicographic order, for inspection.
    pub fn first_terms(&self, n: usize) -> Vec<(&str, &PostingList)> {
        let mut terms: Vec<(&str, &PostingList)> = self.terms.iter().map(|(t, p)| (t.as_str(), p)).collect();
        terms.sort_unstable_by(|a, b| a.0.cmp(b.0));
        terms.truncate(n);
        terms
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostingList)> + '_ {
        self.terms.iter().map(|(t, p)| (t.as_str(), p))
    }
}

/// One ranked entry of a retrieval: a frequency for boolean results, a similarity for vector results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub doc_id: DocId,
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<Hit>,
}

impl RetrievalResult {
    pub fn from_postings(postings: &[Posting]) -> Self {
        let hits = postings.iter().map(|p| Hit { doc_id: p.doc_id, score: p.frequency as f32 }).collect();
        Self { hits }
    }

    pub fn doc_ids(&self) -> Vec<DocId> { self.hits.iter().map(|h| h.doc_id).collect() }
    pub fn len(&self) -> usize { self.hits.len() }
    pub fn is_empty(&self) -> bool { self.hits.is_empty() }

    /// Comma-separated doc ids, in rank order.
    pub fn to_id_list(&self) -> String {
        self.hits.iter().map(|h| h.doc_id.to_string()).collect::<Vec<_>>().join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Whitespace;
    impl Analyzer for Whitespace {
        fn analyze(&self, _field: &str, text: &str) -> Vec<String> {
            text.split_whitespace().map(str::to_string).collect()
        }
    }

    fn doc(id: DocId, title: &str, content: &str) -> Document {
        Document { id, title: title.into(), content: content.into(), ..Default::default() }
    }

    #[test]
    fn counts_frequency_per_document() {
        let index = InvertedIndex::build(&[doc(1, "", "cat dog"), doc(2, "", "dog dog")], &Whitespace);
        let dog: Vec<Posting> = index.postings("dog").unwrap().as_slice().to_vec();
        assert_eq!(dog, vec![Posting { doc_id: 1, frequency: 1 }, Posting { doc_id: 2, frequency: 2 }]);
        assert_eq!(index.collection_frequency("dog"), 3);
        assert_eq!(index.doc_ids(), &[1, 2]);
    }

    #[test]
    fn title_terms_add_to_content_frequency() {
        let index = InvertedIndex::build(&[doc(1, "dog", "dog cat")], &Whitespace);
        assert_eq!(index.postings("dog").unwrap().as_slice(), &[Posting { doc_id: 1, frequency: 2 }]);
    }

    #[test]
    fn out_of_order_documents_stay_sorted() {
        let index = InvertedIndex::build(&[doc(5, "", "x"), doc(2, "", "x x"), doc(9, "", "x"), doc(2, "y", "")], &Whitespace);
        let ids: Vec<DocId> = index.postings("x").unwrap().doc_ids().collect();
        assert_eq!(ids, vec![2, 5, 9]);
        assert_eq!(index.postings("x").unwrap().as_slice()[0].frequency, 2);
        assert_eq!(index.doc_ids(), &[2, 5, 9]);
    }

    #[test]
    fn first_terms_are_sorted() {
        let index = InvertedIndex::build(&[doc(1, "", "pear apple fig")], &Whitespace);
        let terms: Vec<&str> = index.first_terms(2).into_iter().map(|(t, _)| t).collect();
        assert_eq!(terms, vec!["apple", "fig"]);
    }
}
