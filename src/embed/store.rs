//! Persisted token models
//!
//! Models live in an explicit cache directory as
//! `<backend>_vs<vector_size>_w<window>.model`, encoded with bitcode.
//! A missing model is trained from the node descriptors of every graph file
//! in the vocabulary directory (or the corpus directory when the vocabulary
//! directory does not exist), written to a temp file and renamed into place,
//! so a failed run never leaves a partial model behind.

use super::{NodeDescriptor, TrainParams, TrainableEmbedding};
use crate::embed::EmbeddingBackend;
use crate::error::{DatasetError, Result};
use crate::graph::list_graph_files;
use crate::graph::raw::RawNodes;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Where training data comes from and where models are kept
#[derive(Debug, Clone, Copy)]
pub struct ModelSource<'a> {
    pub corpus_dir: &'a Path,
    pub vocab_dir: &'a Path,
    pub cache_dir: &'a Path,
}

/// Path of the persisted model for a backend and its key parameters
pub fn model_path(cache_dir: &Path, backend: EmbeddingBackend, vector_size: usize, window: usize) -> PathBuf {
    cache_dir.join(format!(
        "{}_vs{}_w{}.model",
        backend.model_prefix(),
        vector_size,
        window
    ))
}

/// Load the persisted model, training and persisting it first if needed.
/// Idempotent once the model file exists.
pub fn load_or_train<M: TrainableEmbedding>(source: &ModelSource<'_>, params: &TrainParams) -> Result<M> {
    let path = model_path(source.cache_dir, M::BACKEND, params.vector_size, params.window);

    if !path.exists() {
        let model = train_from_corpus::<M>(source, params)?;
        persist(&model, &path)?;
        info!("Created {} model at {}", M::BACKEND, path.display());
    }

    load::<M>(&path)
}

fn train_from_corpus<M: TrainableEmbedding>(source: &ModelSource<'_>, params: &TrainParams) -> Result<M> {
    let directory = if source.vocab_dir.is_dir() {
        source.vocab_dir
    } else {
        source.corpus_dir
    };
    if !directory.is_dir() {
        return Err(DatasetError::MissingCorpus(directory.to_path_buf()));
    }

    info!(
        "Generating {} model from {} (vector size {}, window {})...",
        M::BACKEND,
        directory.display(),
        params.vector_size,
        params.window
    );
    let start = Instant::now();

    let sentences = read_sentences(directory)?;
    let total_nodes: usize = sentences.iter().map(Vec::len).sum();
    if total_nodes == 0 {
        return Err(DatasetError::EmptyCorpus(directory.to_path_buf()));
    }
    info!(
        "Average nodes per graph: {:.2}.",
        total_nodes as f64 / sentences.len() as f64
    );

    let model = M::train(&sentences, params)?;
    debug!(
        "Trained {} model with {} descriptors in {:.2?}",
        M::BACKEND,
        model.vocab_size(),
        start.elapsed()
    );
    Ok(model)
}

/// One ordered descriptor sequence per graph file
fn read_sentences(directory: &Path) -> Result<Vec<Vec<String>>> {
    let files = list_graph_files(directory)?;

    files
        .par_iter()
        .map(|path| {
            let content = std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
            let graph: RawNodes =
                serde_json::from_str(&content).map_err(|e| DatasetError::MalformedGraph {
                    path: path.clone(),
                    source: e,
                })?;
            Ok(graph
                .nodes
                .iter()
                .map(|n| NodeDescriptor::new(&n.node_type, &n.value).into_string())
                .collect())
        })
        .collect()
}

fn persist<M: TrainableEmbedding>(model: &M, path: &Path) -> Result<()> {
    let bytes = bitcode::serialize(model).map_err(|e| DatasetError::ModelCodec {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
    }
    let tmp = path.with_extension("model.tmp");
    std::fs::write(&tmp, bytes).map_err(|e| DatasetError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| DatasetError::io(path, e))
}

fn load<M: TrainableEmbedding>(path: &Path) -> Result<M> {
    let bytes = std::fs::read(path).map_err(|e| DatasetError::io(path, e))?;
    let model: M = bitcode::deserialize(&bytes).map_err(|e| DatasetError::ModelCodec {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!("Loaded {} model from {}", M::BACKEND, path.display());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{SubwordModel, TokenEmbedding, Word2VecModel};

    fn write_graph(dir: &Path, name: &str, nodes: &[(&str, &str)]) {
        let nodes: Vec<serde_json::Value> = nodes
            .iter()
            .map(|(t, v)| serde_json::json!({ "nodeType": t, "value": v }))
            .collect();
        std::fs::write(
            dir.join(name),
            serde_json::json!({ "nodes": nodes }).to_string(),
        )
        .unwrap();
    }

    fn params() -> TrainParams {
        TrainParams {
            vector_size: 4,
            window: 2,
            min_count: 1,
            epochs: 1,
            negative: 1,
            seed: 0,
            buckets: 16,
        }
    }

    #[test]
    fn test_model_path_keyed_by_params() {
        let path = model_path(Path::new("/cache"), EmbeddingBackend::Word2Vec, 100, 5);
        assert_eq!(path, PathBuf::from("/cache/word2vec_vs100_w5.model"));
    }

    #[test]
    fn test_train_persist_then_reload() {
        let corpus = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        write_graph(corpus.path(), "a.json", &[("CALL", "f()"), ("IDENTIFIER", "x")]);
        write_graph(corpus.path(), "b.json", &[("IDENTIFIER", "x"), ("LITERAL", "1")]);

        let source = ModelSource {
            corpus_dir: corpus.path(),
            vocab_dir: &corpus.path().join("missing-vocab"),
            cache_dir: cache.path(),
        };

        let first: Word2VecModel = load_or_train(&source, &params()).unwrap();
        let path = model_path(cache.path(), EmbeddingBackend::Word2Vec, 4, 2);
        assert!(path.exists());
        assert!(!path.with_extension("model.tmp").exists());

        // Second load reads the persisted file even after the corpus is gone
        std::fs::remove_file(corpus.path().join("a.json")).unwrap();
        std::fs::remove_file(corpus.path().join("b.json")).unwrap();
        let second: Word2VecModel = load_or_train(&source, &params()).unwrap();
        assert_eq!(first.vocab_size(), second.vocab_size());
        assert_eq!(first.get_vector("IDENTIFIER:x"), second.get_vector("IDENTIFIER:x"));
    }

    #[test]
    fn test_vocab_dir_preferred_over_corpus() {
        let corpus = tempfile::tempdir().unwrap();
        let vocab = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        write_graph(corpus.path(), "a.json", &[("CALL", "corpus_only()")]);
        write_graph(vocab.path(), "v.json", &[("CALL", "vocab_only()")]);

        let source = ModelSource {
            corpus_dir: corpus.path(),
            vocab_dir: vocab.path(),
            cache_dir: cache.path(),
        };
        let model: Word2VecModel = load_or_train(&source, &params()).unwrap();
        assert!(model.contains("CALL:vocab_only()"));
        assert!(!model.contains("CALL:corpus_only()"));
    }

    #[test]
    fn test_missing_corpus_is_fatal_and_persists_nothing() {
        let cache = tempfile::tempdir().unwrap();
        let nowhere = cache.path().join("nowhere");
        let source = ModelSource {
            corpus_dir: &nowhere,
            vocab_dir: &nowhere,
            cache_dir: cache.path(),
        };

        let err = load_or_train::<Word2VecModel>(&source, &params()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingCorpus(_)));
        assert_eq!(std::fs::read_dir(cache.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_subword_persist_then_reload() {
        let corpus = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        write_graph(corpus.path(), "a.json", &[("CALL", "strcpy(buf, src)"), ("IDENTIFIER", "buf")]);
        write_graph(corpus.path(), "b.json", &[("IDENTIFIER", "buf"), ("LITERAL", "0")]);

        let source = ModelSource {
            corpus_dir: corpus.path(),
            vocab_dir: corpus.path(),
            cache_dir: cache.path(),
        };

        let first: SubwordModel = load_or_train(&source, &params()).unwrap();
        let path = model_path(cache.path(), EmbeddingBackend::Subword, 4, 2);
        assert_eq!(path.file_name().unwrap(), "subword_vs4_w2.model");
        assert!(path.exists());
        assert!(!model_path(cache.path(), EmbeddingBackend::Word2Vec, 4, 2).exists());

        std::fs::remove_file(corpus.path().join("a.json")).unwrap();
        std::fs::remove_file(corpus.path().join("b.json")).unwrap();
        let second: SubwordModel = load_or_train(&source, &params()).unwrap();
        assert_eq!(first.vocab_size(), second.vocab_size());
        assert_eq!(first.get_vector("IDENTIFIER:buf"), second.get_vector("IDENTIFIER:buf"));
        // Unseen descriptors resolve through the persisted n-gram rows
        assert_eq!(first.get_vector("IDENTIFIER:bufsize"), second.get_vector("IDENTIFIER:bufsize"));
    }

    #[test]
    fn test_training_skips_non_graph_files() {
        let corpus = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        write_graph(corpus.path(), "a.json", &[("CALL", "f()"), ("IDENTIFIER", "x")]);
        std::fs::write(corpus.path().join("split.txt"), "0:TRAIN:a.json\n").unwrap();

        let source = ModelSource {
            corpus_dir: corpus.path(),
            vocab_dir: corpus.path(),
            cache_dir: cache.path(),
        };
        let model: Word2VecModel = load_or_train(&source, &params()).unwrap();
        assert!(model.contains("IDENTIFIER:x"));
    }
}
