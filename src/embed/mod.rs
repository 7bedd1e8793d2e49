//! Token embeddings for graph nodes
//!
//! A node is embedded through its descriptor (`nodeType:value`, whitespace
//! normalized). Two backends share one call contract:
//!
//! - `word2vec`: closed vocabulary, one row per descriptor seen at least
//!   `min_count` times; unseen descriptors fall back to the most frequent one.
//! - `subword`: open vocabulary, descriptor rows plus hashed character
//!   n-gram rows; every descriptor resolves to a vector.
//!
//! Models are trained lazily from the corpus and persisted in an explicit
//! cache directory, keyed by backend, vector size and window.

mod cache;
mod sgns;
pub mod store;
mod subword;
mod vocab;
mod word2vec;

pub use cache::TokenVectorCache;
pub use store::{load_or_train, model_path, ModelSource};
pub use subword::SubwordModel;
pub use vocab::Vocabulary;
pub use word2vec::Word2VecModel;

use crate::config::DatasetConfig;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Embedding backend selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmbeddingBackend {
    #[default]
    #[serde(rename = "word2vec")]
    Word2Vec,
    #[serde(rename = "subword")]
    Subword,
}

impl EmbeddingBackend {
    /// File name prefix of persisted models
    pub fn model_prefix(&self) -> &'static str {
        match self {
            EmbeddingBackend::Word2Vec => "word2vec",
            EmbeddingBackend::Subword => "subword",
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_prefix())
    }
}

/// Embedding key of a node: its syntactic kind and literal text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeDescriptor(String);

impl NodeDescriptor {
    /// Whitespace runs in `text` collapse to a single space and the result
    /// is trimmed, so reformatted code maps to the same descriptor.
    pub fn new(kind: &str, text: &str) -> Self {
        let mut descriptor = String::with_capacity(kind.len() + text.len() + 1);
        descriptor.push_str(kind.trim());
        descriptor.push(':');
        for (i, word) in text.split_whitespace().enumerate() {
            if i > 0 {
                descriptor.push(' ');
            }
            descriptor.push_str(word);
        }
        Self(descriptor)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lookup contract shared by every embedding backend
pub trait TokenEmbedding: Send + Sync {
    fn backend(&self) -> EmbeddingBackend;

    fn vector_size(&self) -> usize;

    /// Number of descriptors that own a dedicated row
    fn vocab_size(&self) -> usize;

    /// Vector for a descriptor. Never fails: closed-vocabulary backends
    /// return their default vector for unseen descriptors.
    fn get_vector(&self, descriptor: &str) -> Vec<f32>;
}

impl<M: TokenEmbedding + ?Sized> TokenEmbedding for Box<M> {
    fn backend(&self) -> EmbeddingBackend {
        (**self).backend()
    }

    fn vector_size(&self) -> usize {
        (**self).vector_size()
    }

    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }

    fn get_vector(&self, descriptor: &str) -> Vec<f32> {
        (**self).get_vector(descriptor)
    }
}

/// A backend that can be trained from descriptor sequences and persisted
pub trait TrainableEmbedding: TokenEmbedding + Serialize + DeserializeOwned + Sized {
    const BACKEND: EmbeddingBackend;

    /// Each inner sequence is one graph's ordered node descriptors.
    fn train(sentences: &[Vec<String>], params: &TrainParams) -> Result<Self>;
}

/// Hyperparameters for training a token model
#[derive(Debug, Clone, PartialEq)]
pub struct TrainParams {
    pub vector_size: usize,
    pub window: usize,
    pub min_count: usize,
    pub epochs: usize,
    pub negative: usize,
    pub seed: u64,
    /// Hash buckets for character n-grams (subword backend only)
    pub buckets: usize,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self::from_config(&DatasetConfig::default())
    }
}

impl TrainParams {
    pub fn from_config(config: &DatasetConfig) -> Self {
        Self {
            vector_size: config.w2v_vector_size,
            window: config.w2v_window,
            min_count: config.w2v_min_count,
            epochs: config.w2v_epochs,
            negative: config.w2v_negative,
            seed: config.random_seed,
            buckets: config.subword_buckets,
        }
    }
}
