//! glice - data shaping for graph-based vulnerability detection
//!
//! Loads per-file program-dependence graphs exported by Joern, encodes their
//! edges into directed relation channels, embeds node descriptors with a
//! corpus-trained token model, balances the training fold per stratum and
//! merges graphs into minibatches bounded by a total node count.
//!
//! ```text
//! GraphLoader (EdgeTypeScheme + TokenVectorCache)
//!     -> Vec<GraphRecord>
//!     -> ClassBalancer (train fold only)
//!     -> BatchAssembler
//!     -> Batch (handed to the model)
//! ```

pub mod cli;
pub mod config;
pub mod dataset;
pub mod edges;
pub mod embed;
pub mod error;
pub mod graph;

pub use config::DatasetConfig;
pub use dataset::{Batch, BatchAssembler, ClassBalancer, DataFold, JoernDataset, SplitManifest};
pub use edges::EdgeTypeScheme;
pub use embed::{EmbeddingBackend, NodeDescriptor, TokenEmbedding, TokenVectorCache};
pub use error::{DatasetError, Result};
pub use graph::{GraphLoader, GraphRecord, TargetValue};
