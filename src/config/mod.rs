use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// User-level preferences that sit alongside, but outside of, the core state machine.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Default log verbosity when `-v` is not given on the command line.
    pub log_level: String,

    /// Whether an unsupported or malformed command, normally a warning, should be treated as a
    /// hard failure instead.
    pub warnings_as_errors: bool,

    /// Directory an output path is resolved against when the CLI is given a bare filename.
    pub default_output_directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            warnings_as_errors: false,
            default_output_directory: None,
        }
    }
}

impl Config {
    /// Loads from the conventional path, falling back to `Config::default()` if the file is
    /// missing rather than failing the whole run.
    pub fn load() -> Result<Self> {
        let path = Self::get_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    pub fn get_path() -> Result<PathBuf> {
        let home_dir = home::home_dir().context("Failed to get user's home directory.")?;
        Ok(home_dir.join(".config/gerber_core/config.yaml"))
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config = std::fs::read_to_string(path).context("Failed to read config file.")?;
        let config: Self =
            serde_yaml::from_str(&config).context("Failed to decode config file.")?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_baseline_preferences() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.warnings_as_errors);
        assert!(config.default_output_directory.is_none());
    }
}
