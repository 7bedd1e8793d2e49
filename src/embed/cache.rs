//! Memoized descriptor -> vector lookups
//!
//! Every lookup consults the in-process cache first and only queries the
//! underlying model on a miss. The cache is a `DashMap`, so parallel graph
//! loading can share one instance.

use super::store::{self, ModelSource};
use super::{
    EmbeddingBackend, NodeDescriptor, SubwordModel, TokenEmbedding, TrainParams, Word2VecModel,
};
use crate::error::Result;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Thread-safe descriptor vector cache over an embedding model
pub struct TokenVectorCache<M: TokenEmbedding = Box<dyn TokenEmbedding>> {
    model: M,
    vectors: DashMap<String, Arc<[f32]>>,
    /// Number of times the model itself was queried
    model_queries: AtomicUsize,
}

impl TokenVectorCache {
    /// Load the persisted model for `backend`, training and persisting one
    /// first if none exists for this vector size and window.
    pub fn load(
        source: &ModelSource<'_>,
        backend: EmbeddingBackend,
        params: &TrainParams,
    ) -> Result<Self> {
        let model: Box<dyn TokenEmbedding> = match backend {
            EmbeddingBackend::Word2Vec => {
                Box::new(store::load_or_train::<Word2VecModel>(source, params)?)
            }
            EmbeddingBackend::Subword => {
                Box::new(store::load_or_train::<SubwordModel>(source, params)?)
            }
        };
        Ok(Self::new(model))
    }
}

impl<M: TokenEmbedding> TokenVectorCache<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            vectors: DashMap::new(),
            model_queries: AtomicUsize::new(0),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn vector_size(&self) -> usize {
        self.model.vector_size()
    }

    /// Vector for a node descriptor (cached)
    pub fn get_vector(&self, descriptor: &NodeDescriptor) -> Arc<[f32]> {
        // Check cache first
        if let Some(vector) = self.vectors.get(descriptor.as_str()) {
            return Arc::clone(&vector);
        }

        // The entry guard holds the shard lock, so concurrent misses on the
        // same descriptor query the model once
        let entry = self
            .vectors
            .entry(descriptor.as_str().to_string())
            .or_insert_with(|| {
                self.model_queries.fetch_add(1, Ordering::Relaxed);
                Arc::from(self.model.get_vector(descriptor.as_str()))
            });
        Arc::clone(&entry)
    }

    /// Number of distinct descriptors cached so far
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn model_queries(&self) -> usize {
        self.model_queries.load(Ordering::Relaxed)
    }
}
