use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Dataset file used when neither the command line nor the config names one
pub const DEFAULT_DATASET_PATH: &str = "data.json";

/// Log level used when nothing else sets one
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// User configuration, read from a YAML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Dataset file to edit by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<PathBuf>,

    /// Default log level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Loads the config from the provided path. A missing file yields defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        // An empty file is a valid, empty config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Save the config to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        // Ensure parent directories exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Dataset path: command line, then config, then the built-in default
    pub fn dataset_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.dataset_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH))
    }

    /// Explicit log level: command line, then config. `None` defers to
    /// `RUST_LOG` and finally [`DEFAULT_LOG_LEVEL`].
    pub fn log_level(&self, flag: Option<&str>) -> Option<String> {
        flag.map(str::to_string).or_else(|| self.log_level.clone())
    }
}

/// Gets the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    // Check if FAMTREE_CONFIG environment variable is set
    if let Ok(path) = std::env::var("FAMTREE_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    let config_dir = dirs::config_dir().context("Failed to determine config directory")?;

    Ok(config_dir.join("famtree").join("config.yaml"))
}
