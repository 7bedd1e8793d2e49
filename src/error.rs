//! Errors raised while loading, embedding and batching graph data

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed graph description {path}: {source}")]
    MalformedGraph {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Graph {path} has no `{key}` edge list")]
    MissingEdgeList { path: PathBuf, key: &'static str },

    #[error("Split manifest not found at {0}")]
    MissingSplitManifest(PathBuf),

    #[error("Malformed split manifest line {line}: {content:?}")]
    MalformedManifestLine { line: usize, content: String },

    #[error("Unknown fold name: {0}")]
    UnknownFold(String),

    #[error("Fold {0} has not been loaded")]
    FoldNotLoaded(String),

    #[error("Corpus directory not found: {0}")]
    MissingCorpus(PathBuf),

    #[error("Corpus at {0} contains no usable node descriptors")]
    EmptyCorpus(PathBuf),

    #[error("No descriptor occurs at least {min_count} times; vocabulary is empty")]
    EmptyVocabulary { min_count: usize },

    #[error("Unknown source language extension in {0}")]
    UnknownLanguage(String),

    #[error("CWE-{cwe} in {path} is not a known defect category")]
    UnknownCwe { cwe: u32, path: PathBuf },

    #[error("Unsafe sample {0} has no CWE")]
    MissingCwe(PathBuf),

    #[error("Failed to (de)serialize token model {path}: {message}")]
    ModelCodec { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;
