//! Configuration loading for sudoku-sync.

use anyhow::{Context, Result};
use std::path::Path;
use sudoku_client::EngineConfig;

/// Load the engine configuration from `path`, or the defaults when no
/// file was given.
pub fn load(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_without_a_file() {
        let config = load(None).unwrap();
        assert_eq!(config.storage.key_prefix, "sudoku-");
    }

    #[test]
    fn reads_storage_section() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\nkey_prefix = \"puzzle-\"\ndata_dir = \"/tmp/sudoku\"").unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.storage.key_prefix, "puzzle-");
        assert_eq!(config.storage.data_dir.as_deref(), Some(Path::new("/tmp/sudoku")));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load(Some(Path::new("/nonexistent/sudoku.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }
}
