//! Graph exports and their in-memory records

mod files;
pub mod labels;
mod loader;
pub(crate) mod raw;
mod record;

pub use files::list_graph_files;
pub use labels::{cwe_class, LabelKind, Language, TargetValue, NUM_CLASSES, SAFE_CLASS};
pub use loader::GraphLoader;
pub use record::{GraphRecord, RecordMeta};
