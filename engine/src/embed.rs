//! A deterministic, model-free embedding provider.
//!
//! Text is tokenized BERT-style into a fixed-length id sequence and the ids are
//! folded into `dimension` buckets, then L2-normalized.

use crate::error::EvalError;
use crate::vector::EmbeddingProvider;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

pub const CLS: &str = "[CLS]";
pub const SEP: &str = "[SEP]";
pub const UNK: &str = "[UNK]";
/// Out-of-vocabulary id used when the vocabulary has no `[UNK]` entry.
pub const DEFAULT_UNK_ID: u32 = 100;
const PAD_ID: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingEmbedderConfig {
    pub dimension: usize,
    pub max_sequence_length: usize,
}

impl Default for HashingEmbedderConfig {
    fn default() -> Self {
        Self { dimension: 256, max_sequence_length: 256 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HashingEmbedder {
    config: HashingEmbedderConfig,
    vocab: Option<HashMap<String, u32>>,
}

impl HashingEmbedder {
    /// Without a vocabulary, token ids come from a stable hash.
    pub fn new(config: HashingEmbedderConfig) -> Self {
        Self { config, vocab: None }
    }

    pub fn with_vocab(config: HashingEmbedderConfig, vocab: HashMap<String, u32>) -> Self {
        Self { config, vocab: Some(vocab) }
    }

    pub fn from_vocab_file(config: HashingEmbedderConfig, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading vocabulary {}", path.display()))?;
        let vocab = parse_vocab(&text);
        tracing::info!(path = %path.display(), size = vocab.len(), "loaded vocabulary");
        Ok(Self::with_vocab(config, vocab))
    }

    /// `[CLS] tokens.. [SEP]`, padded with 0 or truncated to the max sequence length.
    pub fn input_ids(&self, text: &str) -> Vec<u32> {
        let max_len = self.config.max_sequence_length;
        let lowered = text.trim().to_lowercase();
        let mut ids = Vec::with_capacity(max_len);
        ids.push(self.token_id(CLS));
        for token in lowered.split_whitespace() {
            ids.push(self.token_id(token));
        }
        ids.push(self.token_id(SEP));
        ids.resize(max_len, PAD_ID);
        ids
    }

    fn token_id(&self, token: &str) -> u32 {
        match &self.vocab {
            Some(vocab) => vocab
                .get(token)
                .or_else(|| vocab.get(UNK))
                .copied()
                .unwrap_or(DEFAULT_UNK_ID),
            // keep clear of the padding id
            None => fnv1a(token).max(1),
        }
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EvalError> {
        let dim = self.config.dimension;
        if dim == 0 {
            return Err(EvalError::Embedding("dimension must be positive".into()));
        }
        let mut vector = vec![0.0f32; dim];
        for id in self.input_ids(text).into_iter().filter(|&id| id != PAD_ID) {
            vector[id as usize % dim] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() { *x /= norm; }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize { self.config.dimension }
}

/// One token per line, id = line number; the first occurrence of a token wins.
pub fn parse_vocab(text: &str) -> HashMap<String, u32> {
    let mut vocab = HashMap::new();
    for (i, line) in text.lines().enumerate() {
        vocab.entry(line.trim_end().to_string()).or_insert(i as u32);
    }
    vocab
}

fn fnv1a(s: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for b in s.bytes() {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
