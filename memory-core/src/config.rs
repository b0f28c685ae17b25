/// Engine configuration loaded from a TOML file

use crate::error::{MemoryError, Result};
use crate::observability::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `store_path`.
pub const STORE_PATH_ENV: &str = "MEMORY_CORE_STORE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub store_path: PathBuf,
    /// Capacity of the conversation and command lists.
    pub max_memory_items: usize,
    pub max_results_history: usize,
    pub max_context_items: usize,
    /// Per-path interaction cap. Zero disables it.
    pub max_interactions_per_file: usize,
    pub log_format: LogFormat,
    pub semantic: SemanticConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    pub enabled: bool,
    pub top_k: usize,
    pub min_similarity: f32,
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            max_memory_items: 100,
            max_results_history: 5,
            max_context_items: 3,
            max_interactions_per_file: 50,
            log_format: LogFormat::Text,
            semantic: SemanticConfig::default(),
        }
    }
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            top_k: 5,
            min_similarity: 0.35,
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }
}

impl MemoryConfig {
    /// Parse a config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MemoryConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise start from defaults.
    /// `MEMORY_CORE_STORE` wins over whatever the file says.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };

        if let Ok(store) = std::env::var(STORE_PATH_ENV) {
            if !store.trim().is_empty() {
                config.store_path = PathBuf::from(store);
            }
        }

        Ok(config)
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_memory_items == 0 {
            return Err(MemoryError::Config(
                "max_memory_items must be greater than zero".to_string(),
            ));
        }
        if self.max_results_history == 0 {
            return Err(MemoryError::Config(
                "max_results_history must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.semantic.min_similarity) {
            return Err(MemoryError::Config(format!(
                "semantic.min_similarity must be within [0, 1], got {}",
                self.semantic.min_similarity
            )));
        }
        Ok(())
    }

    /// `None` when the per-path cap is disabled.
    pub fn interaction_cap(&self) -> Option<usize> {
        (self.max_interactions_per_file > 0).then_some(self.max_interactions_per_file)
    }
}

fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".memory-core")
        .join("memory.json")
}
