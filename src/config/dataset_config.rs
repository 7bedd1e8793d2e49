//! Dataset hyperparameters
//!
//! Loaded from an optional `glice.toml`, then overridden by a JSON object
//! (the `--data-params-override` flag), then validated.
//!
//! # Configuration Format
//!
//! ```toml
//! # glice.toml
//! max_nodes_per_batch = 10000
//! add_cfg_edges = true
//! add_next_edges = true
//! tie_fwd_bkwd_edges = [0, 4]   # or true / false
//! w2v_vector_size = 100
//! w2v_window = 5
//! embedding_backend = "subword"
//! label_kind = "one_hot"
//! stratify_by = ["cwe", "language"]
//! ```

use crate::dataset::StratumField;
use crate::embed::EmbeddingBackend;
use crate::error::{DatasetError, Result};
use crate::graph::LabelKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "glice.toml";

/// Which forward edge kinds share a channel with their reverse direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TieEdges {
    /// `true` ties every forward kind, `false` ties none
    All(bool),
    /// Tie only the listed forward channel indices
    Only(Vec<usize>),
}

impl Default for TieEdges {
    fn default() -> Self {
        TieEdges::All(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub max_nodes_per_batch: usize,
    /// AST edges form the base channel and are normally always on
    pub add_ast_edges: bool,
    pub add_cfg_edges: bool,
    pub add_reaching_def_edges: bool,
    pub add_cdg_edges: bool,
    pub add_next_edges: bool,
    pub add_self_loop_edges: bool,
    pub tie_fwd_bkwd_edges: TieEdges,
    pub w2v_vector_size: usize,
    pub w2v_window: usize,
    /// Descriptors seen fewer times are dropped from a closed vocabulary
    pub w2v_min_count: usize,
    pub w2v_epochs: usize,
    /// Negative samples per positive pair
    pub w2v_negative: usize,
    /// Character n-gram hash buckets for the subword backend
    pub subword_buckets: usize,
    pub embedding_backend: EmbeddingBackend,
    pub label_kind: LabelKind,
    /// Auxiliary keys defining an oversampling stratum; empty = one stratum
    pub stratify_by: Vec<StratumField>,
    pub random_seed: u64,
    /// Parse graph files on the rayon pool
    pub parallel_load: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            max_nodes_per_batch: 10_000,
            add_ast_edges: true,
            add_cfg_edges: true,
            add_reaching_def_edges: true,
            add_cdg_edges: true,
            add_next_edges: true,
            add_self_loop_edges: true,
            tie_fwd_bkwd_edges: TieEdges::default(),
            w2v_vector_size: 100,
            w2v_window: 5,
            w2v_min_count: 5,
            w2v_epochs: 5,
            w2v_negative: 5,
            subword_buckets: 100_000,
            embedding_backend: EmbeddingBackend::default(),
            label_kind: LabelKind::default(),
            stratify_by: vec![StratumField::Cwe, StratumField::Language],
            random_seed: 0,
            parallel_load: true,
        }
    }
}

impl DatasetConfig {
    /// Load configuration with priority:
    /// 1. JSON overrides (highest)
    /// 2. Config file, if given and present
    /// 3. Built-in defaults
    pub fn load(config_path: Option<&Path>, overrides: Option<&str>) -> Result<Self> {
        let mut config = match config_path.filter(|p| p.exists()) {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
                debug!("Loading dataset config from {}", path.display());
                toml::from_str::<DatasetConfig>(&content)
                    .map_err(|e| DatasetError::Config(format!("{}: {}", path.display(), e)))?
            }
            None => DatasetConfig::default(),
        };

        if let Some(json) = overrides {
            config = config.with_overrides(json)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply a JSON object of overrides on top of this config
    pub fn with_overrides(self, json: &str) -> Result<Self> {
        let overrides: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| DatasetError::Config(format!("override is not valid JSON: {}", e)))?;
        let serde_json::Value::Object(overrides) = overrides else {
            return Err(DatasetError::Config(
                "override must be a JSON object".to_string(),
            ));
        };

        let mut merged = serde_json::to_value(&self)
            .map_err(|e| DatasetError::Config(e.to_string()))?;
        if let serde_json::Value::Object(fields) = &mut merged {
            for (key, value) in overrides {
                if !fields.contains_key(&key) {
                    return Err(DatasetError::Config(format!("unknown parameter `{}`", key)));
                }
                fields.insert(key, value);
            }
        }

        serde_json::from_value(merged).map_err(|e| DatasetError::Config(e.to_string()))
    }

    /// Number of forward edge kinds: AST, CFG, reaching-def, CDG and next,
    /// counting only the enabled ones
    pub fn num_fwd_edge_types(&self) -> usize {
        [
            self.add_ast_edges,
            self.add_cfg_edges,
            self.add_reaching_def_edges,
            self.add_cdg_edges,
            self.add_next_edges,
        ]
        .iter()
        .filter(|&&enabled| enabled)
        .count()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_nodes_per_batch == 0 {
            return Err(DatasetError::Config(
                "max_nodes_per_batch must be at least 1".to_string(),
            ));
        }
        if self.w2v_vector_size == 0 {
            return Err(DatasetError::Config(
                "w2v_vector_size must be at least 1".to_string(),
            ));
        }
        if self.w2v_window == 0 {
            return Err(DatasetError::Config(
                "w2v_window must be at least 1".to_string(),
            ));
        }
        if self.embedding_backend == EmbeddingBackend::Subword && self.subword_buckets == 0 {
            return Err(DatasetError::Config(
                "subword_buckets must be at least 1".to_string(),
            ));
        }
        if let TieEdges::Only(indices) = &self.tie_fwd_bkwd_edges {
            let num_fwd = self.num_fwd_edge_types();
            if let Some(bad) = indices.iter().find(|&&i| i >= num_fwd) {
                return Err(DatasetError::Config(format!(
                    "tied edge type {} out of range for {} forward edge types",
                    bad, num_fwd
                )));
            }
        }
        Ok(())
    }
}
