use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FeatherConfig {
    pub storage: StorageConfig,
    pub index: IndexConfig,
    pub linking: LinkingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub default_dim: usize,
    pub default_modality: String,
}

/// HNSW construction and search parameters, shared by every modality index.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    pub capacity: usize,
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
}

/// Defaults for similarity-driven auto-linking.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LinkingConfig {
    pub threshold: f32,
    pub rel_type: String,
    pub candidates: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_feather_dir()
            .join("context.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            default_dim: 768,
            default_modality: "text".into(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000_000,
            m: 16,
            ef_construction: 200,
            ef_search: 100,
        }
    }
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            threshold: 0.80,
            rel_type: "related_to".into(),
            candidates: 15,
        }
    }
}

/// Returns `~/.feather/`
pub fn default_feather_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".feather")
}

/// Returns the default config file path: `~/.feather/config.toml`
pub fn default_config_path() -> PathBuf {
    default_feather_dir().join("config.toml")
}

impl FeatherConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            FeatherConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (FEATHER_DB, FEATHER_DIM).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FEATHER_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("FEATHER_DIM") {
            if let Ok(dim) = val.parse() {
                self.storage.default_dim = dim;
            }
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
