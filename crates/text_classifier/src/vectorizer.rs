//! Bag-of-words term counting.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tokens are runs of two or more word characters.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern should compile"));

/// Sparse term counts of one document, sorted by feature index.
pub type SparseCounts = Vec<(usize, u32)>;

/// Splits lowercased text into tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Maps documents to term-count vectors over a vocabulary learned at fit time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountVectorizer {
    /// Sorted vocabulary; a term's position is its feature index.
    vocabulary: Vec<String>,

    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl CountVectorizer {
    /// Learns the vocabulary of `documents`.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let terms: BTreeSet<String> = documents
            .iter()
            .flat_map(|doc| tokenize(doc.as_ref()))
            .collect();

        Self::from_vocabulary(terms.into_iter().collect())
    }

    fn from_vocabulary(vocabulary: Vec<String>) -> Self {
        let index = vocabulary
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();

        Self { vocabulary, index }
    }

    /// Rebuilds the term index after deserialization.
    #[must_use]
    pub fn reindexed(self) -> Self {
        Self::from_vocabulary(self.vocabulary)
    }

    /// Counts known terms of `document`; unknown terms are dropped.
    pub fn transform(&self, document: &str) -> SparseCounts {
        let mut counts: HashMap<usize, u32> = HashMap::new();
        for token in tokenize(document) {
            if let Some(&feature) = self.index.get(&token) {
                *counts.entry(feature).or_default() += 1;
            }
        }

        let mut sparse: SparseCounts = counts.into_iter().collect();
        sparse.sort_unstable_by_key(|(feature, _)| *feature);
        sparse
    }

    #[must_use]
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    #[must_use]
    pub fn num_features(&self) -> usize {
        self.vocabulary.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_drops_short_tokens() {
        assert_eq!(
            tokenize("I LOVE my school!"),
            vec!["love", "my", "school"]
        );
    }

    #[test]
    fn test_fit_builds_sorted_vocabulary() {
        let vectorizer = CountVectorizer::fit(&["the cat", "The dog ate the cat"]);
        assert_eq!(vectorizer.vocabulary(), ["ate", "cat", "dog", "the"]);
    }

    #[test]
    fn test_transform_counts_known_terms() {
        let vectorizer = CountVectorizer::fit(&["the cat", "the dog"]);
        let counts = vectorizer.transform("The cat and the bird");
        // cat=0, dog=1, the=2; "and", "bird" are unknown
        assert_eq!(counts, vec![(0, 1), (2, 2)]);
    }

    #[test]
    fn test_reindexed_after_deserialize() {
        let vectorizer = CountVectorizer::fit(&["good day"]);
        let json = serde_json::to_string(&vectorizer).unwrap();
        let restored: CountVectorizer = serde_json::from_str::<CountVectorizer>(&json)
            .unwrap()
            .reindexed();
        assert_eq!(restored.transform("good"), vec![(1, 1)]);
    }
}
