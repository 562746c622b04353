//! Engine Configuration Module
//! Layered settings: built-in defaults, then `tabula.toml`, then `TABULA_*` env vars.

use crate::error::Result;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "tabula.toml";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "TABULA_";

/// K-means tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansSettings {
    pub max_iterations: usize,
    /// Largest per-coordinate centroid shift still treated as "unchanged".
    pub tolerance: f64,
    pub seed: Option<u64>,
}

impl Default for KMeansSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 0.0,
            seed: None,
        }
    }
}

/// Settings shared by the parser, the operations and the host binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub delimiter: char,
    pub has_header: bool,
    pub row_limit: Option<usize>,
    pub kmeans: KMeansSettings,
    pub log_filter: String,
    pub export_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
            row_limit: None,
            kmeans: KMeansSettings::default(),
            log_filter: "info".to_string(),
            export_path: None,
        }
    }
}

impl EngineConfig {
    /// Load from the default file and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load with an explicit TOML file; a missing file is skipped.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = Self::figment(path).extract()?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
