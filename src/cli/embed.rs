//! Embed command - train or load the token model and report on it

use super::spinner_style;
use crate::config::DatasetConfig;
use crate::embed::{
    model_path, ModelSource, NodeDescriptor, TokenEmbedding, TokenVectorCache, TrainParams,
};
use anyhow::{Context, Result};
use console::style;
use indicatif::ProgressBar;
use std::path::Path;
use std::time::{Duration, Instant};

pub fn run(
    config: &DatasetConfig,
    data_dir: &Path,
    vocab_dir: &Path,
    cache_dir: &Path,
    lookups: &[String],
) -> Result<()> {
    let params = TrainParams::from_config(config);
    let path = model_path(
        cache_dir,
        config.embedding_backend,
        params.vector_size,
        params.window,
    );
    let existed = path.exists();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style()?);
    spinner.set_message(if existed {
        format!("Loading {} model...", config.embedding_backend)
    } else {
        format!("Training {} model...", config.embedding_backend)
    });
    spinner.enable_steady_tick(Duration::from_millis(100));

    let start = Instant::now();
    let source = ModelSource {
        corpus_dir: data_dir,
        vocab_dir,
        cache_dir,
    };
    let tokens = TokenVectorCache::load(&source, config.embedding_backend, &params);
    spinner.finish_and_clear();
    let tokens = tokens.context("Failed to prepare token model")?;

    println!("\nToken model ({})\n", style(config.embedding_backend).bold());
    println!("  Path: {}", style(path.display()).dim());
    println!(
        "  Status: {}",
        if existed {
            style("loaded").green()
        } else {
            style("trained").yellow()
        }
    );
    println!("  Vocabulary: {}", style(tokens.model().vocab_size()).cyan());
    println!("  Vector size: {}", style(tokens.vector_size()).cyan());
    println!("  Time: {:.2?}", start.elapsed());

    if !lookups.is_empty() {
        println!();
        for lookup in lookups {
            let (kind, text) = lookup.split_once(':').unwrap_or((lookup.as_str(), ""));
            let descriptor = NodeDescriptor::new(kind, text);
            let vector = tokens.get_vector(&descriptor);
            let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            let head: Vec<String> = vector.iter().take(4).map(|x| format!("{:.3}", x)).collect();
            println!(
                "  {} |v|={:.3} [{}, ...]",
                style(descriptor.as_str()).cyan(),
                norm,
                head.join(", ")
            );
        }
    }
    println!();

    Ok(())
}
