//! Corpus directory listing

use crate::error::{DatasetError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const GRAPH_EXTENSION: &str = "json";

/// Graph exports (`*.json`) directly inside `directory`, sorted by name.
/// Anything else there, such as a split manifest, is skipped.
pub fn list_graph_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(directory).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(directory).to_path_buf();
            DatasetError::io(path, std::io::Error::other(e.to_string()))
        })?;
        let is_graph = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(GRAPH_EXTENSION));
        if entry.file_type().is_file() && is_graph {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_only_top_level_json_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.JSON", "split.txt", "word2vec_vs8_w5.model"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.json"), "{}").unwrap();

        let names: Vec<String> = list_graph_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JSON", "b.json"]);
    }
}
