//! CLI command definitions and handlers

mod batches;
mod embed;
mod inspect;
mod split;

use crate::config::{self, DatasetConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressStyle;
use std::path::{Path, PathBuf};

/// glice - Joern graph dataset preparation
#[derive(Parser, Debug)]
#[command(name = "glice")]
#[command(
    version,
    about = "Turn Joern program-dependence graphs into class-balanced, node-bounded minibatches",
    after_help = "\
Examples:
  glice split data/graphs                         Write split.txt (10 stratified folds)
  glice embed data/graphs                         Train or load the token model
  glice batches data/graphs --fold train          Summarize the training batches of split 0
  glice batches data/graphs -s 3 --format json    JSON summary for split 3
  glice inspect data/graphs/sample_017.json       Show one graph's channels"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Dataset config file (default: ./glice.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON object overriding individual dataset parameters
    #[arg(long, global = true)]
    pub data_params_override: Option<String>,

    /// Directory for persisted token models (default: ~/.cache/glice)
    #[arg(long, global = true, env = "GLICE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a stratified k-fold split manifest (reused if it already exists)
    Split {
        /// Directory of graph files
        data_dir: PathBuf,

        /// Manifest to write
        #[arg(long, short = 'm', default_value = crate::dataset::SPLIT_FILE_NAME)]
        manifest: PathBuf,

        /// Number of k-fold splits (at least 3)
        #[arg(long, default_value_t = crate::dataset::split::DEFAULT_NUM_SPLITS)]
        n_splits: usize,

        /// Shuffle seed
        #[arg(long, default_value_t = crate::dataset::split::DEFAULT_SPLIT_SEED)]
        seed: u64,
    },

    /// Train (or load) the token-embedding model for the configured backend
    Embed {
        /// Directory of graph files
        data_dir: PathBuf,

        /// Vocabulary corpus (default: the data directory)
        #[arg(long)]
        vocab_dir: Option<PathBuf>,

        /// Descriptors (`nodeType:value`) to look up after loading
        #[arg(long = "lookup")]
        lookups: Vec<String>,
    },

    /// Load one fold of a split and summarize its batches
    Batches {
        /// Directory of graph files
        data_dir: PathBuf,

        /// Vocabulary corpus (default: the data directory)
        #[arg(long)]
        vocab_dir: Option<PathBuf>,

        /// Split manifest
        #[arg(long, short = 'm', default_value = crate::dataset::SPLIT_FILE_NAME)]
        manifest: PathBuf,

        /// Split index to use
        #[arg(long, short = 's', default_value = "0")]
        split_index: usize,

        /// Fold: train, valid(ation) or test
        #[arg(long, default_value = "train")]
        fold: String,

        /// Shuffle the fold before batching
        #[arg(long)]
        shuffle: bool,

        /// Output format: text or json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Load a single graph file and show its encoded channels
    Inspect {
        /// Graph file
        file: PathBuf,

        /// Vocabulary corpus (default: the file's directory)
        #[arg(long)]
        vocab_dir: Option<PathBuf>,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.data_params_override.as_deref())?;
    let cache_dir = cli.cache_dir;

    match cli.command {
        Commands::Split {
            data_dir,
            manifest,
            n_splits,
            seed,
        } => split::run(&data_dir, &manifest, n_splits, seed),

        Commands::Embed {
            data_dir,
            vocab_dir,
            lookups,
        } => {
            let cache_dir = resolve_cache_dir(cache_dir.as_deref())?;
            let vocab_dir = vocab_dir.unwrap_or_else(|| data_dir.clone());
            embed::run(&config, &data_dir, &vocab_dir, &cache_dir, &lookups)
        }

        Commands::Batches {
            data_dir,
            vocab_dir,
            manifest,
            split_index,
            fold,
            shuffle,
            format,
        } => {
            let cache_dir = resolve_cache_dir(cache_dir.as_deref())?;
            let vocab_dir = vocab_dir.unwrap_or_else(|| data_dir.clone());
            let fold = fold.parse().context("Invalid --fold")?;
            batches::run(
                config,
                batches::Source {
                    data_dir: &data_dir,
                    vocab_dir: &vocab_dir,
                    cache_dir: &cache_dir,
                    manifest: &manifest,
                },
                split_index,
                fold,
                shuffle,
                &format,
            )
        }

        Commands::Inspect { file, vocab_dir } => {
            let cache_dir = resolve_cache_dir(cache_dir.as_deref())?;
            inspect::run(&config, &file, vocab_dir.as_deref(), &cache_dir)
        }
    }
}

/// Explicit `--config`, else `glice.toml` in the working directory
fn load_config(path: Option<&Path>, overrides: Option<&str>) -> Result<DatasetConfig> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    }
    let path = path.unwrap_or(Path::new(config::CONFIG_FILE_NAME));
    DatasetConfig::load(Some(path), overrides).context("Failed to load dataset config")
}

fn resolve_cache_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_cache_dir);
    config::ensure_cache_dir(&dir)
        .with_context(|| format!("Failed to create cache directory {}", dir.display()))
}

fn spinner_style() -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")?)
}

fn bar_style() -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("█▓▒░  "))
}
