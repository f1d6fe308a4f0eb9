//! CLI configuration file.
//!
//! Stored as YAML in ~/.faceid/config.yaml:
//!
//! ```yaml
//! store_path: /home/me/.faceid/data/faces.redb
//! engine:
//!   metric: cosine
//!   threshold: 0.7
//!   min_valid: 3
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use faceid_engine::EngineConfig;

/// Base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".faceid";
/// Configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Store filename under the data directory.
pub const DEFAULT_STORE_FILE: &str = "faces.redb";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identity store file. Defaults to ~/.faceid/data/faces.redb.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    pub engine: EngineConfig,

    /// Path the config was loaded from (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

impl Config {
    fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(DEFAULT_CONFIG_FILE))
    }

    fn default_store_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join("data").join(DEFAULT_STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Store file to open: `override_path`, then `store_path`, then the default.
    pub fn resolve_store_path(&self, override_path: Option<&str>) -> anyhow::Result<PathBuf> {
        if let Some(p) = override_path {
            return Ok(PathBuf::from(p));
        }
        if let Some(p) = &self.store_path {
            return Ok(p.clone());
        }
        Self::default_store_path().ok_or_else(|| anyhow::anyhow!("cannot determine store path"))
    }

    /// Default engine settings at the same path, with the store path pinned.
    pub fn with_defaults(&self, store_override: Option<&str>) -> anyhow::Result<Self> {
        Ok(Self {
            store_path: Some(self.resolve_store_path(store_override)?),
            engine: EngineConfig::default(),
            config_path: self.config_path.clone(),
        })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }
}

/// Loads the configuration. A missing file yields the defaults.
pub fn load_config(custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = match custom_path {
        Some(p) => PathBuf::from(p),
        None => Config::default_config_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?,
    };

    let mut cfg: Config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("read {}", config_path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("parse {}", config_path.display()))?
    } else {
        Config::default()
    };

    cfg.engine
        .validate()
        .with_context(|| format!("config {}", config_path.display()))?;
    cfg.config_path = config_path;
    Ok(cfg)
}
