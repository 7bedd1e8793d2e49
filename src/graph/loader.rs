//! Graph file -> GraphRecord
//!
//! 1. Parse the export
//! 2. Collect the enabled forward edge lists (plus synthesized next edges)
//! 3. Expand them into channels through the edge-type scheme
//! 4. Resolve node vectors through the token cache
//! 5. Derive language, safe flag and target
//!
//! Edge indices are trusted to be in range; the exporter guarantees it.

use super::labels::{Language, TargetValue};
use super::raw::RawGraph;
use super::record::{GraphRecord, RecordMeta};
use crate::config::DatasetConfig;
use crate::edges::{next_edges, AdjacencyList, EdgeKind, EdgeTypeScheme};
use crate::embed::{NodeDescriptor, TokenEmbedding, TokenVectorCache};
use crate::error::{DatasetError, Result};
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub struct GraphLoader<'a, M: TokenEmbedding = Box<dyn TokenEmbedding>> {
    config: &'a DatasetConfig,
    scheme: &'a EdgeTypeScheme,
    kinds: Vec<EdgeKind>,
    tokens: &'a TokenVectorCache<M>,
}

impl<'a, M: TokenEmbedding> GraphLoader<'a, M> {
    pub fn new(
        config: &'a DatasetConfig,
        scheme: &'a EdgeTypeScheme,
        tokens: &'a TokenVectorCache<M>,
    ) -> Self {
        Self {
            config,
            scheme,
            kinds: EdgeKind::enabled(config),
            tokens,
        }
    }

    /// Load `filename` from `data_dir`
    pub fn load_file(&self, data_dir: &Path, filename: &str) -> Result<GraphRecord> {
        let path = data_dir.join(filename);
        let content = std::fs::read_to_string(&path).map_err(|e| DatasetError::io(&path, e))?;
        self.parse(filename, &path, &content)
    }

    /// Load several files, in order. Any malformed file fails the whole load.
    ///
    /// `on_loaded` is invoked once per finished file (progress reporting).
    pub fn load_all(
        &self,
        data_dir: &Path,
        filenames: &[String],
        on_loaded: &(dyn Fn() + Sync),
    ) -> Result<Vec<GraphRecord>> {
        let load_one = |filename: &String| {
            let record = self.load_file(data_dir, filename);
            on_loaded();
            record
        };

        if self.config.parallel_load {
            filenames.par_iter().map(load_one).collect()
        } else {
            filenames.iter().map(load_one).collect()
        }
    }

    /// Build a record from file content; `path` is only used in errors
    pub fn parse(&self, filename: &str, path: &Path, content: &str) -> Result<GraphRecord> {
        let graph: RawGraph =
            serde_json::from_str(content).map_err(|e| DatasetError::MalformedGraph {
                path: path.to_path_buf(),
                source: e,
            })?;
        let num_nodes = graph.nodes.len();

        let mut forward: Vec<AdjacencyList> = Vec::with_capacity(self.kinds.len());
        for &kind in &self.kinds {
            let edges = match kind {
                EdgeKind::Next => next_edges(num_nodes),
                _ => graph.edge_list(kind).ok_or_else(|| DatasetError::MissingEdgeList {
                    path: path.to_path_buf(),
                    key: kind.json_key().unwrap_or("edges"),
                })?,
            };
            forward.push(edges);
        }
        let adjacency_lists = self.scheme.encode(forward, num_nodes);

        let node_features: Vec<Arc<[f32]>> = graph
            .nodes
            .iter()
            .map(|n| self.tokens.get_vector(&NodeDescriptor::new(&n.node_type, &n.value)))
            .collect();

        let language = graph
            .file_path
            .as_deref()
            .map(Language::from_path)
            .transpose()?;
        let is_safe = graph.is_safe();
        let label = TargetValue::encode(self.config.label_kind, is_safe, graph.cwe, path)?;

        let mut meta = RecordMeta::new(filename, is_safe);
        meta.language = language;
        meta.cwe = graph.cwe;

        debug!(
            "Loaded {} ({} nodes, {} edges)",
            filename,
            num_nodes,
            adjacency_lists.iter().map(Vec::len).sum::<usize>()
        );

        Ok(GraphRecord {
            adjacency_lists,
            node_features,
            label,
            meta,
        })
    }
}
