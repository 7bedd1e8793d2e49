//! Configuration module for glice
//!
//! This module handles:
//! - Dataset hyperparameters (glice.toml + JSON overrides)
//! - Cache directory resolution for persisted token models

mod dataset_config;
pub mod paths;

pub use dataset_config::{DatasetConfig, TieEdges, CONFIG_FILE_NAME};
pub use paths::{default_cache_dir, ensure_cache_dir};
