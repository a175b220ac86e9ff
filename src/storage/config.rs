//! Workspace configuration
//!
//! Stored in `.linefix/config.toml`. Missing file means defaults; a
//! present but unparseable file is an error rather than a silent reset.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Refuse AI responses containing unparseable lines instead of
    /// skipping them
    pub strict_parse: bool,

    /// Cap on skipped-line diagnostics echoed per absorbed response
    pub max_skip_report: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_parse: false,
            max_skip_report: 20,
        }
    }
}

impl Config {
    /// Loads the config file at `path`, defaulting when it is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Writes the config as TOML to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, raw)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }
}
