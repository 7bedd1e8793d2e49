//! In-memory form of one parsed, encoded graph

use super::labels::Language;
use crate::edges::AdjacencyList;
use std::sync::Arc;

/// Record metadata; the stratification keys and safe flag are only read by
/// the class balancer
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMeta {
    /// Graph file name relative to the corpus directory
    pub filename: String,
    pub language: Option<Language>,
    pub cwe: Option<u32>,
    pub is_safe: bool,
}

impl RecordMeta {
    pub fn new(filename: impl Into<String>, is_safe: bool) -> Self {
        Self {
            filename: filename.into(),
            language: None,
            cwe: None,
            is_safe,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_cwe(mut self, cwe: u32) -> Self {
        self.cwe = Some(cwe);
        self
    }
}

/// A graph ready for batching.
///
/// Every pair in `adjacency_lists` indexes into `node_features`; channels
/// follow the `EdgeTypeScheme` layout.
#[derive(Debug, Clone)]
pub struct GraphRecord<L = super::TargetValue> {
    pub adjacency_lists: Vec<AdjacencyList>,
    /// One vector per node; repeated descriptors share an allocation
    pub node_features: Vec<Arc<[f32]>>,
    pub label: L,
    pub meta: RecordMeta,
}

impl<L> GraphRecord<L> {
    pub fn num_nodes(&self) -> usize {
        self.node_features.len()
    }

    pub fn num_edges(&self) -> usize {
        self.adjacency_lists.iter().map(Vec::len).sum()
    }

    pub fn filename(&self) -> &str {
        &self.meta.filename
    }

    pub fn is_safe(&self) -> bool {
        self.meta.is_safe
    }
}
