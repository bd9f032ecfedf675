use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","an","and","are","as","at","be","but","by","for","if","in","into","is","it",
            "no","not","of","on","or","such","that","the","their","then","there","these",
            "they","this","to","was","will","with",
        ];
        words.iter().copied().collect()
    };
}

/// Turns field text into the ordered sequence of normalized index terms.
///
/// The same analyzer must be used for indexing and for query terms, otherwise
/// casing and stemming will not line up.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, field: &str, text: &str) -> Vec<String>;
}

/// NFKC normalization, lowercasing, stop-word removal and English stemming.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardAnalyzer;

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, _field: &str, text: &str) -> Vec<String> {
        analyze_text(text)
    }
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Analyze text with the standard chain. Possessive suffixes are dropped before stemming.
pub fn analyze_text(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut terms = Vec::new();
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str().trim_end_matches("'s").trim_end_matches('\'');
        if token.is_empty() || is_stopword(token) { continue; }
        terms.push(STEMMER.stem(token).into_owned());
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_analyze() {
        let t = analyze_text("Running, runner's run!");
        assert!(t.iter().any(|w| w == "run"));
    }

    #[test]
    fn keeps_numbers() {
        let t = analyze_text("published in 1984");
        assert_eq!(t, vec!["publish".to_string(), "1984".to_string()]);
    }
}
