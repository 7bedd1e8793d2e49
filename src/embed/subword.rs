//! Open-vocabulary descriptor embeddings
//!
//! fastText-style: a descriptor is the mean of its own row (when it is in
//! the vocabulary) and the hashed rows of its character n-grams. Unseen
//! descriptors still share n-grams with seen ones, so no fallback row is
//! needed.

use super::{sgns, EmbeddingBackend, TokenEmbedding, TrainParams, TrainableEmbedding, Vocabulary};
use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

const MIN_N: usize = 3;
const MAX_N: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubwordModel {
    vocab: Vocabulary,
    vector_size: usize,
    buckets: usize,
    min_n: usize,
    max_n: usize,
    /// Row-major `(vocab.len() + buckets) * vector_size`; word rows first
    vectors: Vec<f32>,
}

/// Bucket rows of `<token>`'s character n-grams, offset past the word rows
fn ngram_rows(token: &str, min_n: usize, max_n: usize, buckets: usize, offset: usize) -> Vec<u32> {
    let bounded: Vec<char> = std::iter::once('<')
        .chain(token.chars())
        .chain(std::iter::once('>'))
        .collect();

    let mut rows = Vec::new();
    let mut gram = String::new();
    for start in 0..bounded.len() {
        for n in min_n..=max_n {
            let end = start + n;
            if end > bounded.len() {
                break;
            }
            gram.clear();
            gram.extend(&bounded[start..end]);
            let bucket = (xxh3_64(gram.as_bytes()) % buckets as u64) as usize;
            rows.push((offset + bucket) as u32);
        }
    }
    rows
}

impl SubwordModel {
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    fn input_rows(&self, descriptor: &str) -> Vec<u32> {
        let mut rows = Vec::new();
        if let Some(index) = self.vocab.index_of(descriptor) {
            rows.push(index);
        }
        rows.extend(ngram_rows(
            descriptor,
            self.min_n,
            self.max_n,
            self.buckets,
            self.vocab.len(),
        ));
        rows
    }
}

impl TokenEmbedding for SubwordModel {
    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Subword
    }

    fn vector_size(&self) -> usize {
        self.vector_size
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    fn get_vector(&self, descriptor: &str) -> Vec<f32> {
        let dim = self.vector_size;
        let rows = self.input_rows(descriptor);
        let mut vector = vec![0.0f32; dim];
        if rows.is_empty() {
            return vector;
        }

        let scale = 1.0 / rows.len() as f32;
        for row in rows {
            let start = row as usize * dim;
            for (v, r) in vector.iter_mut().zip(&self.vectors[start..start + dim]) {
                *v += r * scale;
            }
        }
        vector
    }
}

impl TrainableEmbedding for SubwordModel {
    const BACKEND: EmbeddingBackend = EmbeddingBackend::Subword;

    fn train(sentences: &[Vec<String>], params: &TrainParams) -> Result<Self> {
        if params.buckets == 0 {
            return Err(DatasetError::Config(
                "subword_buckets must be at least 1".to_string(),
            ));
        }

        let vocab = Vocabulary::build(sentences, params.min_count);
        if vocab.is_empty() {
            return Err(DatasetError::EmptyVocabulary {
                min_count: params.min_count,
            });
        }

        let word_rows: Vec<Vec<u32>> = (0..vocab.len() as u32)
            .map(|i| {
                let token = vocab.token(i).unwrap_or_default();
                let mut rows = vec![i];
                rows.extend(ngram_rows(token, MIN_N, MAX_N, params.buckets, vocab.len()));
                rows
            })
            .collect();
        let encoded: Vec<Vec<u32>> = sentences.iter().map(|s| vocab.encode(s)).collect();
        let counts: Vec<u64> = vocab.counts().collect();

        let vectors = sgns::train(
            &encoded,
            &word_rows,
            vocab.len() + params.buckets,
            &counts,
            params,
        );

        Ok(Self {
            vocab,
            vector_size: params.vector_size,
            buckets: params.buckets,
            min_n: MIN_N,
            max_n: MAX_N,
            vectors,
        })
    }
}
