//! Configuration management for studykit
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. `~/.studykit/config.toml`
//! 3. environment variables (`OPENAI_API_KEY`, `BASE_URL`, `STUDYKIT_MODEL`,
//!    `STUDYKIT_OUTPUT_DIR`)
//! 4. a `.env` file in the working directory, whose values replace the
//!    process environment
//! 5. command-line flags (applied by the binary)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OUTPUT_DIR: &str = "results";
const ENV_FILE: &str = ".env";

/// studykit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat model identifier
    pub model: String,
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    /// API key; usually supplied through the environment rather than the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Directory that receives `<name>_<type>.txt` result files
    pub output_dir: PathBuf,
    /// Sampling temperature; the endpoint default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Per-request timeout; the HTTP client default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Version of config schema (for future migrations)
    pub version: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            temperature: None,
            timeout_secs: None,
            version: 1,
        }
    }
}

impl Config {
    /// Get the config file path (~/.studykit/config.toml)
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".studykit").join("config.toml"))
    }

    /// Load a config file, or None if it doesn't exist
    pub fn load_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(Some(config))
    }

    /// Resolve configuration from the config file, `.env` and the environment.
    pub fn load() -> Result<Self> {
        let mut config = match Self::path() {
            Ok(path) => Self::load_file(&path)?.unwrap_or_default(),
            Err(_) => Self::default(),
        };

        let env_file = Path::new(ENV_FILE);
        if env_file.exists() {
            if let Err(e) = Self::load_env_file(env_file) {
                warn!(error = %format!("{:#}", e), "ignoring .env file");
            }
        }

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Export the variables of a `.env` file, overriding values already set.
    pub fn load_env_file(path: &Path) -> Result<()> {
        dotenvy::from_path_override(path)
            .with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Overlay environment values; `lookup` abstracts `std::env::var`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = non_empty("BASE_URL") {
            self.base_url = url;
        }
        if let Some(model) = non_empty("STUDYKIT_MODEL") {
            self.model = model;
        }
        if let Some(dir) = non_empty("STUDYKIT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
    }

    /// Save config to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// The API key, or an error explaining how to set one.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => bail!("No API key configured. Set OPENAI_API_KEY in the environment or a .env file"),
        }
    }

    /// First 8 characters of the API key, for display.
    pub fn masked_api_key(&self) -> String {
        match self.api_key.as_deref() {
            Some(key) => format!("{}...", key.chars().take(8).collect::<String>()),
            None => "(not set)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.output_dir, PathBuf::from("results"));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-abcdefghijkl"),
            ("BASE_URL", "http://localhost:8080/v1"),
            ("STUDYKIT_MODEL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("sk-abcdefghijkl"));
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        // Empty values are ignored.
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.masked_api_key(), "sk-abcde...");
    }

    #[test]
    fn test_env_file_overrides_environment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "STUDYKIT_ENV_FILE_TEST_MODEL=from-file\n").unwrap();
        std::env::set_var("STUDYKIT_ENV_FILE_TEST_MODEL", "from-env");

        Config::load_env_file(&path).unwrap();
        assert_eq!(std::env::var("STUDYKIT_ENV_FILE_TEST_MODEL").unwrap(), "from-file");

        assert!(Config::load_env_file(&dir.path().join("absent.env")).is_err());
    }

    #[test]
    fn test_require_api_key() {
        let mut config = Config::default();
        assert!(config.require_api_key().is_err());
        config.api_key = Some("sk-x".to_string());
        assert_eq!(config.require_api_key().unwrap(), "sk-x");
    }

    #[test]
    fn test_file_roundtrip_and_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.model = "gpt-4.1-mini".to_string();
        config.timeout_secs = Some(30);
        config.save(&path).unwrap();

        let loaded = Config::load_file(&path).unwrap().unwrap();
        assert_eq!(loaded, config);

        std::fs::write(&path, "model = \"local\"\n").unwrap();
        let partial = Config::load_file(&path).unwrap().unwrap();
        assert_eq!(partial.model, "local");
        assert_eq!(partial.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(Config::load_file(&dir.path().join("absent.toml")).unwrap().is_none());
    }
}
