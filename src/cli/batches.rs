//! Batches command - load one fold and summarize the batches it yields

use super::bar_style;
use crate::config::DatasetConfig;
use crate::dataset::{DataFold, JoernDataset, SplitManifest};
use anyhow::{Context, Result};
use console::style;
use indicatif::ProgressBar;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// Input locations for one dataset
pub struct Source<'a> {
    pub data_dir: &'a Path,
    pub vocab_dir: &'a Path,
    pub cache_dir: &'a Path,
    pub manifest: &'a Path,
}

#[derive(Serialize)]
struct BatchSummary {
    graphs: usize,
    nodes: usize,
    edges_per_channel: Vec<usize>,
}

#[derive(Serialize)]
struct FoldSummary {
    split_index: usize,
    fold: &'static str,
    graphs: usize,
    safe_graphs: usize,
    num_edge_types: usize,
    node_feature_shape: [usize; 1],
    max_nodes_per_batch: usize,
    batches: Vec<BatchSummary>,
}

pub fn run(
    config: DatasetConfig,
    source: Source<'_>,
    split_index: usize,
    fold: DataFold,
    shuffle: bool,
    format: &str,
) -> Result<()> {
    let start = Instant::now();
    let total_files = SplitManifest::load(source.manifest)
        .context("Failed to read split manifest")?
        .filenames(split_index, fold)
        .len();

    let max_nodes_per_batch = config.max_nodes_per_batch;
    let mut dataset = JoernDataset::new(
        split_index,
        source.data_dir,
        source.vocab_dir,
        source.cache_dir,
        config,
    )?
    .with_manifest(source.manifest);

    let bar = ProgressBar::new(total_files as u64);
    bar.set_style(bar_style()?);
    bar.set_message(format!("Loading {} graphs...", fold.name().to_lowercase()));
    let loaded = dataset.load_data_with(Some(&[fold]), &|| bar.inc(1));
    bar.finish_and_clear();
    loaded.with_context(|| format!("Failed to load {} fold of split {}", fold, split_index))?;

    if shuffle {
        dataset.shuffle(fold)?;
    }

    let records = dataset.records(fold)?;
    let summary = FoldSummary {
        split_index,
        fold: fold.name(),
        graphs: records.len(),
        safe_graphs: records.iter().filter(|r| r.is_safe()).count(),
        num_edge_types: dataset.num_edge_types(),
        node_feature_shape: dataset.node_feature_shape(),
        max_nodes_per_batch,
        batches: dataset
            .batches(fold)?
            .map(|batch| BatchSummary {
                graphs: batch.num_graphs_in_batch,
                nodes: batch.num_nodes(),
                edges_per_channel: batch.adjacency_lists.iter().map(Vec::len).collect(),
            })
            .collect(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => print_text(&summary, start),
    }
    Ok(())
}

fn print_text(summary: &FoldSummary, start: Instant) {
    println!(
        "\nSplit {} / {}\n",
        style(summary.split_index).bold(),
        style(summary.fold).bold()
    );
    println!(
        "  Graphs: {} ({} safe, {} unsafe)",
        style(summary.graphs).cyan(),
        summary.safe_graphs,
        summary.graphs - summary.safe_graphs
    );
    println!("  Edge types: {}", style(summary.num_edge_types).cyan());
    println!("  Node features: {:?}", summary.node_feature_shape);
    println!(
        "  Batches: {} (max {} nodes)",
        style(summary.batches.len()).cyan(),
        summary.max_nodes_per_batch
    );
    println!();

    for (i, batch) in summary.batches.iter().enumerate() {
        let edges: usize = batch.edges_per_channel.iter().sum();
        let nodes = if batch.nodes > summary.max_nodes_per_batch {
            style(batch.nodes).yellow()
        } else {
            style(batch.nodes).white()
        };
        println!(
            "  {:>4}  {:>4} graphs  {:>6} nodes  {:>7} edges",
            i, batch.graphs, nodes, edges
        );
    }
    println!("\n  Time: {:.2?}\n", start.elapsed());
}
