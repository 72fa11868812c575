//! Bridge configuration file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use uadmx_control::{ArtNetConfig, AuditConfig, PatternConfig, WebServerConfig};
use uadmx_core::{LogConfig, ResolverConfig};

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "uadmx.toml";

/// Where the node graph comes from and how to read it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding the nodeset XML
    pub directory: PathBuf,
    /// Display name of the fixture object type
    pub fixture_type: String,
    /// Display name of the universe object type, checked when set
    pub universe_type: Option<String>,
    /// Namespace index of `/variable/:id` requests
    pub namespace: u16,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("models"),
            fixture_type: "DMXLight".to_string(),
            universe_type: None,
            namespace: 1,
        }
    }
}

impl ModelConfig {
    pub fn resolver_config(&self) -> ResolverConfig {
        let config = ResolverConfig::new(self.fixture_type.clone());
        match &self.universe_type {
            Some(universe_type) => config.with_universe_type(universe_type.clone()),
            None => config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturesConfig {
    /// Catalog root: `<directory>/<manufacturer>/<fixture>.json`
    pub directory: PathBuf,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("fixtures"),
        }
    }
}

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub server: WebServerConfig,
    pub model: ModelConfig,
    pub fixtures: FixturesConfig,
    pub artnet: ArtNetConfig,
    pub audit: AuditConfig,
    pub patterns: PatternConfig,
    pub logging: LogConfig,
}

impl BridgeConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("In {}", path.display()))
    }

    /// Load `path`, or the default file when present, or the defaults
    pub fn locate(path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = path {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        let default = Path::new(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            return Ok((Self::load(default)?, Some(default.to_path_buf())));
        }
        Ok((Self::default(), None))
    }
}
