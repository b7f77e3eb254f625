//! Result persistence
//!
//! Writes each artifact to `<output_dir>/<source-name>_<result-type>.txt`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes result texts into an output directory
#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Path a result of `result_type` for `source_path` is written to
    pub fn result_path(&self, result_type: &str, source_path: &Path) -> PathBuf {
        let base_name = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        self.output_dir.join(format!("{}_{}.txt", base_name, result_type))
    }

    /// Save a result, creating the output directory if needed
    pub fn save(&self, text: &str, result_type: &str, source_path: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory {}", self.output_dir.display())
        })?;

        let path = self.result_path(result_type, source_path);
        std::fs::write(&path, text)
            .with_context(|| format!("Failed to save {} result to {}", result_type, path.display()))?;

        info!(result_type, path = %path.display(), "saved result");
        Ok(path)
    }
}
