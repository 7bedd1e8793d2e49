//! Split command - write or reuse a k-fold manifest

use crate::dataset::{generate_split, DataFold};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub fn run(data_dir: &Path, manifest_path: &Path, n_splits: usize, seed: u64) -> Result<()> {
    let existed = manifest_path.exists();
    let manifest = generate_split(data_dir, manifest_path, n_splits, seed).with_context(|| {
        format!(
            "Failed to build split manifest for {}",
            data_dir.display()
        )
    })?;

    let verb = if existed { "Reused" } else { "Wrote" };
    println!(
        "\n{} {} ({} splits)\n",
        verb,
        style(manifest_path.display()).cyan(),
        manifest.num_splits()
    );

    for split_index in 0..manifest.num_splits() {
        let counts: Vec<String> = DataFold::ALL
            .iter()
            .map(|&fold| {
                format!(
                    "{} {}",
                    fold.name().to_lowercase(),
                    style(manifest.filenames(split_index, fold).len()).cyan()
                )
            })
            .collect();
        println!("  split {:>2}: {}", split_index, counts.join(", "));
    }
    println!();

    Ok(())
}
