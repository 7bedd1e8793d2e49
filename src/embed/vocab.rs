//! Descriptor vocabulary built from a training corpus

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Descriptors ordered by descending frequency; row `i` of a model's
/// matrix belongs to entry `i`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    entries: IndexMap<String, u64>,
}

impl Vocabulary {
    /// Count descriptors across all sentences and keep those seen at least
    /// `min_count` times. Ties in frequency keep first-appearance order.
    pub fn build(sentences: &[Vec<String>], min_count: usize) -> Self {
        let mut counts: IndexMap<&str, u64> = IndexMap::new();
        for sentence in sentences {
            for token in sentence {
                *counts.entry(token.as_str()).or_insert(0) += 1;
            }
        }

        let mut kept: Vec<(&str, u64)> = counts
            .into_iter()
            .filter(|&(_, count)| count >= min_count as u64)
            .collect();
        // Stable sort keeps first-appearance order among equal counts
        kept.sort_by(|a, b| b.1.cmp(&a.1));

        Self {
            entries: kept
                .into_iter()
                .map(|(token, count)| (token.to_string(), count))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_of(&self, token: &str) -> Option<u32> {
        self.entries.get_index_of(token).map(|i| i as u32)
    }

    pub fn token(&self, index: u32) -> Option<&str> {
        self.entries
            .get_index(index as usize)
            .map(|(token, _)| token.as_str())
    }

    pub fn counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.values().copied()
    }

    /// Map a sentence to vocabulary ids, dropping out-of-vocabulary tokens
    pub fn encode(&self, sentence: &[String]) -> Vec<u32> {
        sentence.iter().filter_map(|t| self.index_of(t)).collect()
    }
}
