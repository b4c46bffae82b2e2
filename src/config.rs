//! Configuration for structural search

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Directory holding per-project settings, relative to the search root
pub const CONFIG_DIR: &str = ".reflex";

/// AST search configuration (`[ast]` section of `.reflex/config.toml`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstConfig {
    /// Search timeout in seconds (0 = no timeout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Default cap on returned matches
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_results() -> usize {
    100
}

impl Default for AstConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_results: default_max_results(),
        }
    }
}

impl AstConfig {
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Load AST config from `<root>/.reflex/config.toml`
///
/// Falls back to defaults if the file doesn't exist or has no `[ast]` section.
pub fn load_config(root: &Path) -> Result<AstConfig> {
    let config_path = root.join(CONFIG_DIR).join("config.toml");

    if !config_path.is_file() {
        log::debug!("No config.toml found at {}, using default AST config", config_path.display());
        return Ok(AstConfig::default());
    }

    let config_str = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    let toml_value: toml::Value = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;

    match toml_value.get("ast") {
        Some(table) => table
            .clone()
            .try_into::<AstConfig>()
            .context("Failed to parse [ast] section"),
        None => {
            log::debug!("No [ast] section in config.toml, using defaults");
            Ok(AstConfig::default())
        }
    }
}
