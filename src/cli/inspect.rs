//! Inspect command - encode a single graph file and show its channels

use crate::config::DatasetConfig;
use crate::edges::EdgeTypeScheme;
use crate::embed::{ModelSource, TokenVectorCache, TrainParams};
use crate::graph::GraphLoader;
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub fn run(config: &DatasetConfig, file: &Path, vocab_dir: Option<&Path>, cache_dir: &Path) -> Result<()> {
    let data_dir = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Not a graph file: {}", file.display()))?;

    let source = ModelSource {
        corpus_dir: data_dir,
        vocab_dir: vocab_dir.unwrap_or(data_dir),
        cache_dir,
    };
    let tokens = TokenVectorCache::load(
        &source,
        config.embedding_backend,
        &TrainParams::from_config(config),
    )
    .context("Failed to prepare token model")?;

    let scheme = EdgeTypeScheme::from_config(config);
    let loader = GraphLoader::new(config, &scheme, &tokens);
    let record = loader
        .load_file(data_dir, filename)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    println!("\n{}\n", style(file.display()).bold());
    println!("  Nodes: {}", style(record.num_nodes()).cyan());
    println!("  Edges: {}", style(record.num_edges()).cyan());
    if let Some(language) = record.meta.language {
        println!("  Language: {}", language);
    }
    match record.meta.cwe {
        Some(cwe) => println!("  CWE: {}", cwe),
        None => println!("  CWE: {}", style("none").dim()),
    }
    println!(
        "  Label: {}",
        if record.is_safe() {
            style("safe").green()
        } else {
            style("unsafe").red()
        }
    );
    println!("  Target: {}", serde_json::to_string(&record.label)?);
    println!();

    let num_fwd = scheme.num_fwd_edge_types();
    for (channel, edges) in record.adjacency_lists.iter().enumerate() {
        let role = if channel < num_fwd {
            if scheme.is_tied(channel) {
                "forward+reverse"
            } else {
                "forward"
            }
        } else if scheme.has_self_loops() && channel + 1 == scheme.num_edge_types() {
            "self-loop"
        } else {
            "reverse"
        };
        println!("  channel {:>2} {:<16} {:>6} edges", channel, role, edges.len());
    }
    println!();

    Ok(())
}
