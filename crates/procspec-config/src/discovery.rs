use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::model::{ConfigSource, TomlConfig};
use crate::Config;

/// Directory holding the config file, relative to a project directory.
pub const CONFIG_DIR: &str = ".procspec";

/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "PROCSPEC_CONFIG";

impl Config {
    /// Discover configuration from environment and filesystem.
    ///
    /// - `PROCSPEC_CONFIG` (if set) names the config file explicitly
    /// - otherwise search upward from the current directory
    /// - otherwise built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn discover() -> Result<Self, ConfigError> {
        Self::discover_over(Self::default())
    }

    /// Like [`discover`](Self::discover), merging the file over `base`.
    pub fn discover_over(base: Self) -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::load_over(Path::new(&path), base);
        }

        match std::env::current_dir() {
            Ok(dir) => Self::discover_from_over(&dir, base),
            Err(e) => {
                debug!(error = %e, "Current directory unavailable; using default config");
                Ok(base)
            }
        }
    }

    /// Discover configuration starting at `start_dir`.
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path) -> Result<Self, ConfigError> {
        Self::discover_from_over(start_dir, Self::default())
    }

    /// Like [`discover_from`](Self::discover_from), merging the file over `base`.
    pub fn discover_from_over(start_dir: &Path, base: Self) -> Result<Self, ConfigError> {
        match Self::discover_config_file_from(start_dir) {
            Some(path) => Self::load_over(&path, base),
            None => Ok(base),
        }
    }

    /// Load configuration from an explicit file. The file must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_over(path, Self::default())
    }

    /// Load an explicit file and merge it over `base`.
    pub fn load_over(path: &Path, base: Self) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let toml: TomlConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), "Loaded config file");
        Self::from_toml_over(base, toml, ConfigSource::File(path.to_path_buf()))
    }

    /// Walk up from `start_dir` looking for `.procspec/config.toml`, stopping
    /// at repository root markers (.git, .hg, .svn) or the filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir;

        loop {
            let config_path = current_dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.is_file() {
                return Some(config_path);
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                return None;
            }

            current_dir = current_dir.parent()?;
        }
    }
}
