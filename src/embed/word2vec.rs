//! Closed-vocabulary descriptor embeddings

use super::{sgns, EmbeddingBackend, TokenEmbedding, TrainParams, TrainableEmbedding, Vocabulary};
use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};

/// One row per vocabulary descriptor. Descriptors outside the vocabulary
/// resolve to row 0, the most frequent descriptor in the training corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word2VecModel {
    vocab: Vocabulary,
    vector_size: usize,
    /// Row-major `vocab.len() * vector_size`
    vectors: Vec<f32>,
}

impl Word2VecModel {
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    fn row(&self, index: u32) -> &[f32] {
        let start = index as usize * self.vector_size;
        &self.vectors[start..start + self.vector_size]
    }

    /// Whether the descriptor owns a row (no fallback needed)
    pub fn contains(&self, descriptor: &str) -> bool {
        self.vocab.index_of(descriptor).is_some()
    }
}

impl TokenEmbedding for Word2VecModel {
    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Word2Vec
    }

    fn vector_size(&self) -> usize {
        self.vector_size
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    fn get_vector(&self, descriptor: &str) -> Vec<f32> {
        let index = self.vocab.index_of(descriptor).unwrap_or(0);
        self.row(index).to_vec()
    }
}

impl TrainableEmbedding for Word2VecModel {
    const BACKEND: EmbeddingBackend = EmbeddingBackend::Word2Vec;

    fn train(sentences: &[Vec<String>], params: &TrainParams) -> Result<Self> {
        let vocab = Vocabulary::build(sentences, params.min_count);
        if vocab.is_empty() {
            return Err(DatasetError::EmptyVocabulary {
                min_count: params.min_count,
            });
        }

        let encoded: Vec<Vec<u32>> = sentences.iter().map(|s| vocab.encode(s)).collect();
        let word_rows: Vec<Vec<u32>> = (0..vocab.len() as u32).map(|i| vec![i]).collect();
        let counts: Vec<u64> = vocab.counts().collect();

        let vectors = sgns::train(&encoded, &word_rows, vocab.len(), &counts, params);

        Ok(Self {
            vocab,
            vector_size: params.vector_size,
            vectors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Vec<String>> {
        vec![
            vec!["CALL:f()", "IDENTIFIER:x", "CALL:f()"],
            vec!["IDENTIFIER:x", "CALL:f()", "LITERAL:0"],
        ]
        .into_iter()
        .map(|s| s.into_iter().map(String::from).collect())
        .collect()
    }

    fn params() -> TrainParams {
        TrainParams {
            vector_size: 4,
            window: 2,
            min_count: 1,
            epochs: 2,
            negative: 1,
            seed: 1,
            buckets: 8,
        }
    }

    #[test]
    fn test_unseen_descriptor_falls_back_to_first_entry() {
        let model = Word2VecModel::train(&corpus(), &params()).unwrap();
        assert_eq!(model.vocabulary().token(0), Some("CALL:f()"));

        let fallback = model.get_vector("METHOD:never_seen");
        assert_eq!(fallback, model.get_vector("CALL:f()"));
        assert_eq!(fallback.len(), 4);
        assert!(!model.contains("METHOD:never_seen"));
    }

    #[test]
    fn test_min_count_too_high_is_empty_vocabulary() {
        let mut p = params();
        p.min_count = 50;
        let err = Word2VecModel::train(&corpus(), &p).unwrap_err();
        assert!(matches!(err, DatasetError::EmptyVocabulary { min_count: 50 }));
    }
}
