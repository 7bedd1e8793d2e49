//! Edge-type channel encoding
//!
//! A graph's declared relations (AST, CFG, reaching-def, CDG) plus the
//! synthetic "next node" relation are the forward edge kinds. Every forward
//! kind gets a reverse direction, either in its own channel or folded into
//! the forward channel when tied. Self-loops, when enabled, form one extra
//! trailing channel.
//!
//! Channel layout for `F` forward kinds with tie set `T`:
//!
//! ```text
//! [0 .. F)            forward channels (tied ones also hold reversed pairs)
//! [F .. 2F - |T|)     reverse channels of the untied kinds, in kind order
//! [2F - |T|]          self-loops (optional)
//! ```
//!
//! The downstream model's channel-indexed weights depend on this layout, so
//! the scheme is a pure function of configuration.

use crate::config::{DatasetConfig, TieEdges};
use std::collections::BTreeSet;

/// Directed (source, destination) node index pair, local to one graph
pub type Edge = (u32, u32);

/// Pairs for a single channel
pub type AdjacencyList = Vec<Edge>;

/// Forward edge kinds in channel order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Ast,
    Cfg,
    ReachingDef,
    Cdg,
    /// Synthesized (i, i + 1) for consecutive nodes
    Next,
}

impl EdgeKind {
    /// Key of the declared edge list in a graph description, `None` for
    /// synthesized kinds
    pub fn json_key(&self) -> Option<&'static str> {
        match self {
            EdgeKind::Ast => Some("astEdges"),
            EdgeKind::Cfg => Some("cfgEdges"),
            EdgeKind::ReachingDef => Some("reachingDefEdges"),
            EdgeKind::Cdg => Some("cdgEdges"),
            EdgeKind::Next => None,
        }
    }

    /// Enabled forward kinds for a config, in channel order
    pub fn enabled(config: &DatasetConfig) -> Vec<EdgeKind> {
        [
            (EdgeKind::Ast, config.add_ast_edges),
            (EdgeKind::Cfg, config.add_cfg_edges),
            (EdgeKind::ReachingDef, config.add_reaching_def_edges),
            (EdgeKind::Cdg, config.add_cdg_edges),
            (EdgeKind::Next, config.add_next_edges),
        ]
        .into_iter()
        .filter_map(|(kind, on)| on.then_some(kind))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeTypeScheme {
    num_fwd_edge_types: usize,
    tied: BTreeSet<usize>,
    add_self_loops: bool,
}

impl EdgeTypeScheme {
    /// Indices in an explicit tie list that fall outside `0..num_fwd_edge_types`
    /// are ignored.
    pub fn new(num_fwd_edge_types: usize, tie: &TieEdges, add_self_loops: bool) -> Self {
        let tied = match tie {
            TieEdges::All(true) => (0..num_fwd_edge_types).collect(),
            TieEdges::All(false) => BTreeSet::new(),
            TieEdges::Only(indices) => indices
                .iter()
                .copied()
                .filter(|&i| i < num_fwd_edge_types)
                .collect(),
        };

        Self {
            num_fwd_edge_types,
            tied,
            add_self_loops,
        }
    }

    pub fn from_config(config: &DatasetConfig) -> Self {
        Self::new(
            config.num_fwd_edge_types(),
            &config.tie_fwd_bkwd_edges,
            config.add_self_loop_edges,
        )
    }

    pub fn num_fwd_edge_types(&self) -> usize {
        self.num_fwd_edge_types
    }

    /// Forward kinds whose reverse direction shares the forward channel
    pub fn tied_edge_types(&self) -> &BTreeSet<usize> {
        &self.tied
    }

    pub fn is_tied(&self, fwd_index: usize) -> bool {
        self.tied.contains(&fwd_index)
    }

    pub fn has_self_loops(&self) -> bool {
        self.add_self_loops
    }

    /// Total channel count: one per forward kind, one reverse per untied
    /// kind, plus one for self-loops
    pub fn num_edge_types(&self) -> usize {
        let reverse = self.num_fwd_edge_types - self.tied.len();
        self.num_fwd_edge_types + reverse + usize::from(self.add_self_loops)
    }

    /// Channel holding the reverse of forward kind `fwd_index`
    pub fn reverse_channel(&self, fwd_index: usize) -> usize {
        if self.is_tied(fwd_index) {
            return fwd_index;
        }
        let untied_before = (0..fwd_index).filter(|i| !self.tied.contains(i)).count();
        self.num_fwd_edge_types + untied_before
    }

    /// Expand forward adjacency lists (one per enabled forward kind, in
    /// channel order) into the full channel layout.
    pub fn encode(&self, forward: Vec<AdjacencyList>, num_nodes: usize) -> Vec<AdjacencyList> {
        debug_assert_eq!(forward.len(), self.num_fwd_edge_types);

        let mut channels = forward;
        let mut reverse_channels = Vec::with_capacity(self.num_fwd_edge_types - self.tied.len());

        for (fwd_index, channel) in channels.iter_mut().enumerate() {
            let flipped: AdjacencyList = channel.iter().map(|&(src, dst)| (dst, src)).collect();
            if self.is_tied(fwd_index) {
                channel.extend(flipped);
            } else {
                reverse_channels.push(flipped);
            }
        }
        channels.extend(reverse_channels);

        if self.add_self_loops {
            channels.push((0..num_nodes as u32).map(|i| (i, i)).collect());
        }

        debug_assert_eq!(channels.len(), self.num_edge_types());
        channels
    }
}

/// Synthesized sequential edges (i, i + 1); empty for graphs with fewer than two nodes
pub fn next_edges(num_nodes: usize) -> AdjacencyList {
    (1..num_nodes as u32).map(|i| (i - 1, i)).collect()
}
