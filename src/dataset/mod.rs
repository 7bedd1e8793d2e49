//! Fold-level dataset: split manifest -> loaded records -> batches
//!
//! `JoernDataset` owns the records of every loaded fold for one split index.
//! The training fold is oversampled per stratum as it is loaded; batches are
//! assembled lazily on every pass.

mod balance;
mod batch;
pub mod split;

pub use balance::{ClassBalancer, StratumField, StratumKey, StratumStats};
pub use batch::{Batch, BatchAssembler, Batches};
pub use split::{generate_split, SplitEntry, SplitManifest, SPLIT_FILE_NAME};

use crate::config::DatasetConfig;
use crate::edges::EdgeTypeScheme;
use crate::embed::store::ModelSource;
use crate::embed::{TokenVectorCache, TrainParams};
use crate::error::{DatasetError, Result};
use crate::graph::{GraphLoader, GraphRecord};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use tracing::info;

/// Named partition of one k-fold split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataFold {
    Train,
    Validation,
    Test,
}

impl DataFold {
    pub const ALL: [DataFold; 3] = [DataFold::Train, DataFold::Validation, DataFold::Test];

    /// Name used in split manifests
    pub fn name(&self) -> &'static str {
        match self {
            DataFold::Train => "TRAIN",
            DataFold::Validation => "VALIDATION",
            DataFold::Test => "TEST",
        }
    }
}

impl fmt::Display for DataFold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataFold {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "train" => Ok(DataFold::Train),
            "validation" | "valid" => Ok(DataFold::Validation),
            "test" => Ok(DataFold::Test),
            _ => Err(DatasetError::UnknownFold(s.to_string())),
        }
    }
}

pub struct JoernDataset {
    split_index: usize,
    data_dir: PathBuf,
    vocab_dir: PathBuf,
    cache_dir: PathBuf,
    manifest_path: PathBuf,
    config: DatasetConfig,
    scheme: EdgeTypeScheme,
    /// Loaded on first `load_data`, then reused across folds
    tokens: Option<TokenVectorCache>,
    loaded: FxHashMap<DataFold, Vec<GraphRecord>>,
    shuffle_rng: ChaCha8Rng,
}

impl JoernDataset {
    /// Dataset over `data_dir` for one split index. The manifest defaults to
    /// `split.txt` in the working directory.
    pub fn new(
        split_index: usize,
        data_dir: impl Into<PathBuf>,
        vocab_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        config: DatasetConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            split_index,
            data_dir: data_dir.into(),
            vocab_dir: vocab_dir.into(),
            cache_dir: cache_dir.into(),
            manifest_path: PathBuf::from(SPLIT_FILE_NAME),
            scheme: EdgeTypeScheme::from_config(&config),
            shuffle_rng: ChaCha8Rng::seed_from_u64(config.random_seed),
            config,
            tokens: None,
            loaded: FxHashMap::default(),
        })
    }

    pub fn with_manifest(mut self, manifest_path: impl Into<PathBuf>) -> Self {
        self.manifest_path = manifest_path.into();
        self
    }

    pub fn split_index(&self) -> usize {
        self.split_index
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn edge_scheme(&self) -> &EdgeTypeScheme {
        &self.scheme
    }

    pub fn num_edge_types(&self) -> usize {
        self.scheme.num_edge_types()
    }

    /// Shape of one node feature vector
    pub fn node_feature_shape(&self) -> [usize; 1] {
        let width = self
            .tokens
            .as_ref()
            .map_or(self.config.w2v_vector_size, |t| t.vector_size());
        [width]
    }

    pub fn token_cache(&self) -> Option<&TokenVectorCache> {
        self.tokens.as_ref()
    }

    /// Load the given folds (all three when `None`), replacing any records
    /// already held for them.
    pub fn load_data(&mut self, folds: Option<&[DataFold]>) -> Result<()> {
        self.load_data_with(folds, &|| {})
    }

    /// `load_data` with a per-file callback for progress reporting
    pub fn load_data_with(
        &mut self,
        folds: Option<&[DataFold]>,
        on_loaded: &(dyn Fn() + Sync),
    ) -> Result<()> {
        let folds = folds.unwrap_or(&DataFold::ALL);
        let manifest = SplitManifest::load(&self.manifest_path)?;

        let tokens = match self.tokens.take() {
            Some(tokens) => tokens,
            None => {
                let source = ModelSource {
                    corpus_dir: &self.data_dir,
                    vocab_dir: &self.vocab_dir,
                    cache_dir: &self.cache_dir,
                };
                TokenVectorCache::load(
                    &source,
                    self.config.embedding_backend,
                    &TrainParams::from_config(&self.config),
                )?
            }
        };

        let result = self.read_folds(&tokens, &manifest, folds, on_loaded);
        self.tokens = Some(tokens);

        for (fold, records) in result? {
            self.loaded.insert(fold, records);
        }
        Ok(())
    }

    fn read_folds(
        &self,
        tokens: &TokenVectorCache,
        manifest: &SplitManifest,
        folds: &[DataFold],
        on_loaded: &(dyn Fn() + Sync),
    ) -> Result<Vec<(DataFold, Vec<GraphRecord>)>> {
        let loader = GraphLoader::new(&self.config, &self.scheme, tokens);
        let mut out = Vec::with_capacity(folds.len());

        for &fold in folds {
            let filenames = manifest.filenames(self.split_index, fold);
            info!(
                "Loading Joern {} data ({} files, split {})",
                fold,
                filenames.len(),
                self.split_index
            );
            let start = Instant::now();
            let mut records = loader.load_all(&self.data_dir, &filenames, on_loaded)?;

            if fold == DataFold::Train {
                let before = records.len();
                records = ClassBalancer::new(self.config.stratify_by.clone()).oversample(records);
                info!(
                    "Oversampled {} training graphs to {}",
                    before,
                    records.len()
                );
            }
            info!(
                "Loaded {} {} graphs in {:.2?}",
                records.len(),
                fold,
                start.elapsed()
            );
            out.push((fold, records));
        }
        Ok(out)
    }

    pub fn is_loaded(&self, fold: DataFold) -> bool {
        self.loaded.contains_key(&fold)
    }

    pub fn records(&self, fold: DataFold) -> Result<&[GraphRecord]> {
        self.loaded
            .get(&fold)
            .map(Vec::as_slice)
            .ok_or_else(|| DatasetError::FoldNotLoaded(fold.name().to_string()))
    }

    /// Source file of every record, in current record order
    pub fn filenames(&self, fold: DataFold) -> Result<Vec<&str>> {
        Ok(self.records(fold)?.iter().map(|r| r.filename()).collect())
    }

    /// Reorder a loaded fold in place. Successive calls continue one seeded
    /// sequence, so a run is reproducible from `random_seed`.
    pub fn shuffle(&mut self, fold: DataFold) -> Result<()> {
        let records = self
            .loaded
            .get_mut(&fold)
            .ok_or_else(|| DatasetError::FoldNotLoaded(fold.name().to_string()))?;
        records.shuffle(&mut self.shuffle_rng);
        Ok(())
    }

    /// Lazy batches over a loaded fold in its current order
    pub fn batches(
        &self,
        fold: DataFold,
    ) -> Result<Batches<'_, crate::graph::TargetValue, std::slice::Iter<'_, GraphRecord>>> {
        let records = self.records(fold)?;
        Ok(BatchAssembler::from_config(&self.config, &self.scheme).batches(records))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
