//! Cache path utilities - token models live under ~/.cache/glice/ unless a
//! directory is passed explicitly

use std::path::{Path, PathBuf};

/// Default cache directory for persisted token models.
/// Uses ~/.cache/glice on Unix, %LOCALAPPDATA%/glice on Windows.
pub fn default_cache_dir() -> PathBuf {
    let base = if cfg!(windows) {
        std::env::var("LOCALAPPDATA")
            .map(PathBuf::from)
            .ok()
            .or_else(dirs::cache_dir)
    } else {
        dirs::cache_dir().or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
    };

    match base {
        Some(base) => base.join("glice"),
        None => PathBuf::from(".glice-cache"),
    }
}

/// Ensure the cache directory exists.
pub fn ensure_cache_dir(cache_dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(cache_dir)?;
    Ok(cache_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_dir_is_namespaced() {
        let dir = default_cache_dir();
        assert!(dir.to_string_lossy().contains("glice"));
    }

    #[test]
    fn test_ensure_cache_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        let created = ensure_cache_dir(&nested).unwrap();
        assert!(created.is_dir());
    }
}
