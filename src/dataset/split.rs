//! k-fold split manifests
//!
//! A manifest is a text file of `<split index>:<FOLD>:<filename>` lines. Each
//! split index partitions the corpus into train, validation and test folds;
//! a dataset instance picks one split index and reads its three file lists.

use super::DataFold;
use crate::graph::list_graph_files;
use crate::error::{DatasetError, Result};
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

pub const SPLIT_FILE_NAME: &str = "split.txt";

/// Default number of k-fold splits for generated manifests
pub const DEFAULT_NUM_SPLITS: usize = 10;

/// Fewest splits that leave train, validation and test all non-empty
pub const MIN_NUM_SPLITS: usize = 3;

/// Default shuffle seed for generated manifests
pub const DEFAULT_SPLIT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitEntry {
    pub split_index: usize,
    pub fold: DataFold,
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitManifest {
    entries: Vec<SplitEntry>,
}

impl SplitManifest {
    /// Read a manifest; a missing file is fatal since no fold can be loaded
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DatasetError::MissingSplitManifest(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let malformed = || DatasetError::MalformedManifestLine {
                line: i + 1,
                content: line.to_string(),
            };

            // Filenames may themselves contain ':'
            let mut parts = line.splitn(3, ':');
            let (Some(index), Some(fold), Some(filename)) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(malformed());
            };
            if filename.is_empty() {
                return Err(malformed());
            }

            entries.push(SplitEntry {
                split_index: index.trim().parse().map_err(|_| malformed())?,
                fold: fold.trim().parse().map_err(|_| malformed())?,
                filename: filename.to_string(),
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[SplitEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct split indices (highest index + 1)
    pub fn num_splits(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.split_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Files of one fold of one split, in manifest order
    pub fn filenames(&self, split_index: usize, fold: DataFold) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.split_index == split_index && e.fold == fold)
            .map(|e| e.filename.clone())
            .collect()
    }

    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for entry in &self.entries {
            let _ = writeln!(text, "{}:{}:{}", entry.split_index, entry.fold.name(), entry.filename);
        }
        text
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
        }
        std::fs::write(path, self.to_text()).map_err(|e| DatasetError::io(path, e))
    }
}

/// Fields a graph file contributes to its split stratum
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StratumFields {
    label: String,
    cwe: Option<u32>,
    file_path: Option<String>,
}

fn stratum_label(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
    let fields: StratumFields =
        serde_json::from_str(&content).map_err(|e| DatasetError::MalformedGraph {
            path: path.to_path_buf(),
            source: e,
        })?;

    let cwe = fields.cwe.map_or("-".to_string(), |c| c.to_string());
    let language = match fields.file_path.as_deref() {
        Some(file_path) => crate::graph::Language::from_path(file_path)?.as_str(),
        None => "-",
    };
    Ok(format!("{}:{}:{}", fields.label, cwe, language))
}

/// Write a stratified k-fold manifest for `data_dir`, or load the existing
/// one at `manifest_path` untouched.
pub fn generate_split(
    data_dir: &Path,
    manifest_path: &Path,
    n_splits: usize,
    seed: u64,
) -> Result<SplitManifest> {
    if manifest_path.exists() {
        info!("Using existing split file {}", manifest_path.display());
        return SplitManifest::load(manifest_path);
    }
    // Validation takes 1/(n_splits - 1) of the remainder; two splits would
    // leave every train fold empty
    if n_splits < MIN_NUM_SPLITS {
        return Err(DatasetError::Config(format!(
            "a k-fold split with validation needs at least {} splits, got {}",
            MIN_NUM_SPLITS, n_splits
        )));
    }
    if !data_dir.is_dir() {
        return Err(DatasetError::MissingCorpus(data_dir.to_path_buf()));
    }

    let files = list_graph_files(data_dir)?;
    let labels: Vec<String> = files
        .par_iter()
        .map(|p| stratum_label(p))
        .collect::<Result<_>>()?;
    let filenames: Vec<String> = files
        .iter()
        .map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default())
        .collect();

    let manifest = stratified_manifest(&filenames, &labels, n_splits, seed);
    manifest.write(manifest_path)?;
    info!(
        "Wrote {} splits over {} files to {}",
        n_splits,
        filenames.len(),
        manifest_path.display()
    );
    Ok(manifest)
}

/// Group sample indices by label, in first-appearance order
fn group_by_label<'l>(indices: &[usize], labels: &'l [String]) -> IndexMap<&'l str, Vec<usize>> {
    let mut classes: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for &i in indices {
        classes.entry(labels[i].as_str()).or_default().push(i);
    }
    classes
}

/// Assign every sample a test fold. Each class is shuffled and dealt
/// round-robin; the deal continues across classes so fold sizes stay even.
fn assign_test_folds(labels: &[String], n_splits: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let all: Vec<usize> = (0..labels.len()).collect();
    let mut fold_of = vec![0; labels.len()];
    let mut next = 0;

    for (_, mut indices) in group_by_label(&all, labels) {
        indices.shuffle(rng);
        for i in indices {
            fold_of[i] = next;
            next = (next + 1) % n_splits;
        }
    }
    fold_of
}

/// Move a rounded `1/denominator` share of every class into validation
fn carve_validation(
    train: &[usize],
    labels: &[String],
    denominator: usize,
    rng: &mut ChaCha8Rng,
) -> (Vec<usize>, Vec<usize>) {
    let mut kept = Vec::with_capacity(train.len());
    let mut valid = Vec::new();

    for (_, mut indices) in group_by_label(train, labels) {
        indices.shuffle(rng);
        let take = (indices.len() + denominator / 2) / denominator;
        valid.extend_from_slice(&indices[..take]);
        kept.extend_from_slice(&indices[take..]);
    }

    kept.sort_unstable();
    valid.sort_unstable();
    (kept, valid)
}

fn stratified_manifest(
    filenames: &[String],
    labels: &[String],
    n_splits: usize,
    seed: u64,
) -> SplitManifest {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let fold_of = assign_test_folds(labels, n_splits, &mut rng);
    let mut entries = Vec::new();

    for split_index in 0..n_splits {
        let (test, rest): (Vec<usize>, Vec<usize>) =
            (0..filenames.len()).partition(|&i| fold_of[i] == split_index);
        let (train, valid) = carve_validation(&rest, labels, n_splits - 1, &mut rng);

        for (fold, indices) in [
            (DataFold::Train, train),
            (DataFold::Validation, valid),
            (DataFold::Test, test),
        ] {
            entries.extend(indices.into_iter().map(|i| SplitEntry {
                split_index,
                fold,
                filename: filenames[i].clone(),
            }));
        }
    }

    SplitManifest { entries }
}
