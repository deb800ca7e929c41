//! Configuration management
//!
//! Resolves where the mastery state, the profile, the concept graphs and the
//! historical transcripts live, and carries the analysis and decay tunables.
//! The resolved paths are handed to the stores explicitly; nothing below the
//! CLI layer reads these locations on its own.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::knowledge::DecayPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage locations
    #[serde(default)]
    pub paths: PathsConfig,
    /// Bootstrap analyzer settings
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Mastery decay settings
    #[serde(default)]
    pub decay: DecayPolicy,
}

/// Optional overrides for storage locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding knowledge_state.json and profile.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Directory of `<domain>.json` concept graphs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphs_dir: Option<PathBuf>,
    /// Root of the per-project transcript directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Upper bound on sessions scanned per run, most recent first
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_sessions() -> usize {
    50
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { max_sessions: default_max_sessions() }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load configuration from a specific file, creating it if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().context("Config path has no parent")?;

        std::fs::create_dir_all(parent).context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }

    /// Directory for the mastery state and the profile
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.paths.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    /// Directory of concept graph documents
    pub fn graphs_dir(&self) -> Result<PathBuf> {
        match &self.paths.graphs_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.data_dir()?.join("knowledge_graphs")),
        }
    }

    /// Root directory of historical transcripts
    pub fn projects_dir(&self) -> Result<PathBuf> {
        match &self.paths.projects_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let home = dirs::home_dir().context("Failed to locate home directory")?;
                Ok(home.join(".claude").join("projects"))
            }
        }
    }

    pub fn state_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("knowledge_state.json"))
    }

    pub fn profile_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("profile.json"))
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "skill-issue", "skill-issue")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Default data directory (`~/.skill-issue`)
pub fn default_data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to locate home directory")?;
    Ok(home.join(".skill-issue"))
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}
