//! Cache-backed corpus stages: documents -> tokens -> inverted index.
//!
//! Each stage is a no-op when already populated, is decoded from the store when
//! cached, and is otherwise computed and written back. `force` skips both
//! shortcuts and rebuilds. Replacing the documents drops the tokens and the
//! index built from them, and a freshly read corpus never reuses cached
//! downstream stages.

use crate::analyzer::Analyzer;
use crate::index::{tokenize_documents, Document, InvertedIndex, TokenizedDocument};
use crate::store::{get_value, set_value, Store};
use anyhow::Result;
use std::time::Instant;

pub const DOCUMENTS_KEY: &str = "documents";
pub const TOKENS_KEY: &str = "document_tokens";
pub const INDEX_KEY: &str = "inverted_index";

pub struct Pipeline<'a> {
    store: &'a dyn Store,
    analyzer: &'a dyn Analyzer,
    documents: Vec<Document>,
    tokens: Vec<TokenizedDocument>,
    index: InvertedIndex,
    /// Documents came from `read`, so cached tokens and index may describe another corpus.
    fresh: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a dyn Store, analyzer: &'a dyn Analyzer) -> Self {
        Self { store, analyzer, documents: Vec::new(), tokens: Vec::new(), index: InvertedIndex::new(), fresh: false }
    }

    /// Load the corpus, calling `read` only when neither memory nor cache has it.
    pub fn load_documents<F>(&mut self, force: bool, read: F) -> Result<usize>
    where
        F: FnOnce() -> Result<Vec<Document>>,
    {
        if !force && !self.documents.is_empty() {
            return Ok(self.documents.len());
        }
        if !force && self.store.exists(DOCUMENTS_KEY)? {
            if let Some(documents) = get_value::<Vec<Document>>(self.store, DOCUMENTS_KEY)? {
                tracing::info!(num_docs = documents.len(), "documents fetched from cache");
                self.replace_documents(documents, false);
                return Ok(self.documents.len());
            }
        }
        let start = Instant::now();
        let documents = read()?;
        set_value(self.store, DOCUMENTS_KEY, &documents)?;
        tracing::info!(num_docs = documents.len(), elapsed_ms = start.elapsed().as_millis() as u64, "documents loaded");
        self.replace_documents(documents, true);
        Ok(self.documents.len())
    }

    fn replace_documents(&mut self, documents: Vec<Document>, fresh: bool) {
        self.documents = documents;
        self.tokens.clear();
        self.index = InvertedIndex::new();
        self.fresh = fresh;
    }

    pub fn tokenize(&mut self, force: bool) -> Result<()> {
        if self.documents.is_empty() {
            tracing::warn!("documents list is empty, nothing to tokenize");
            return Ok(());
        }
        if !force && !self.tokens.is_empty() {
            tracing::debug!("documents already tokenized");
            return Ok(());
        }
        if !force && !self.fresh && self.store.exists(TOKENS_KEY)? {
            if let Some(tokens) = get_value::<Vec<TokenizedDocument>>(self.store, TOKENS_KEY)? {
                tracing::info!(num_docs = tokens.len(), "document tokens fetched from cache");
                self.tokens = tokens;
                return Ok(());
            }
        }
        let start = Instant::now();
        self.tokens = tokenize_documents(&self.documents, self.analyzer);
        set_value(self.store, TOKENS_KEY, &self.tokens)?;
        tracing::info!(num_docs = self.tokens.len(), elapsed_ms = start.elapsed().as_millis() as u64, "tokenized documents");
        Ok(())
    }

    /// Build (or fetch) the index. Tokenizes first if that has not happened yet.
    pub fn build_index(&mut self, force: bool) -> Result<&InvertedIndex> {
        if self.documents.is_empty() {
            tracing::warn!("documents list is empty, nothing to index");
            return Ok(&self.index);
        }
        if !force && !self.index.is_empty() {
            tracing::debug!("inverted index already built");
            return Ok(&self.index);
        }
        if !force && !self.fresh && self.store.exists(INDEX_KEY)? {
            if let Some(index) = get_value::<InvertedIndex>(self.store, INDEX_KEY)? {
                tracing::info!(num_terms = index.num_terms(), "inverted index fetched from cache");
                self.index = index;
                return Ok(&self.index);
            }
        }
        // Tokens, when present, always belong to the current documents.
        if self.tokens.is_empty() {
            self.tokenize(force)?;
        }
        let start = Instant::now();
        self.index = InvertedIndex::from_tokens(&self.tokens);
        set_value(self.store, INDEX_KEY, &self.index)?;
        tracing::info!(
            num_docs = self.index.num_docs(),
            num_terms = self.index.num_terms(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built inverted index"
        );
        Ok(&self.index)
    }

    pub fn documents(&self) -> &[Document] { &self.documents }
    pub fn tokens(&self) -> &[TokenizedDocument] { &self.tokens }
    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn into_parts(self) -> (Vec<Document>, InvertedIndex) {
        (self.documents, self.index)
    }
}
