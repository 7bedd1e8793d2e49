//! Serde schema of Joern graph exports

use crate::edges::{AdjacencyList, EdgeKind};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawEdge {
    pub from: u32,
    pub to: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    #[serde(rename = "nodeType")]
    pub node_type: String,
    pub value: String,
}

/// Node list only; used when reading a corpus for token-model training
#[derive(Debug, Deserialize)]
pub struct RawNodes {
    pub nodes: Vec<RawNode>,
}

/// One exported graph file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGraph {
    /// Path of the analyzed source file; its extension gives the language
    #[serde(default)]
    pub file_path: Option<String>,
    /// `"good"` marks a safe sample; anything else is unsafe
    pub label: String,
    #[serde(default)]
    pub cwe: Option<u32>,
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub ast_edges: Option<Vec<RawEdge>>,
    #[serde(default)]
    pub cfg_edges: Option<Vec<RawEdge>>,
    #[serde(default)]
    pub reaching_def_edges: Option<Vec<RawEdge>>,
    #[serde(default)]
    pub cdg_edges: Option<Vec<RawEdge>>,
}

impl RawGraph {
    pub fn is_safe(&self) -> bool {
        self.label == "good"
    }

    /// Declared edges for a kind, `None` when the key is absent or the kind
    /// is synthesized
    pub fn edge_list(&self, kind: EdgeKind) -> Option<AdjacencyList> {
        let edges = match kind {
            EdgeKind::Ast => self.ast_edges.as_ref(),
            EdgeKind::Cfg => self.cfg_edges.as_ref(),
            EdgeKind::ReachingDef => self.reaching_def_edges.as_ref(),
            EdgeKind::Cdg => self.cdg_edges.as_ref(),
            EdgeKind::Next => None,
        }?;
        Some(edges.iter().map(|e| (e.from, e.to)).collect())
    }
}
