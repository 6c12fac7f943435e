//! Loader Configuration
//!
//! Handles parsing of `zstd-native.toml` files and environment overrides for
//! the native library resolver.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ffi::{LoadStrategy, SearchPathPolicy};

/// Name of the configuration file searched for by [`LoaderConfig::find_and_load`].
pub const CONFIG_FILE_NAME: &str = "zstd-native.toml";

/// Forces the existence probe to report the library as present.
pub const ENV_IGNORE_MISSING_LIBRARY: &str = "ZSTD_NATIVE_IGNORE_MISSING_LIBRARY";
/// Overrides the base directory the `Lib` tree is resolved against.
pub const ENV_BASE_DIR: &str = "ZSTD_NATIVE_BASE_DIR";
/// Overrides the name of the library subdirectory (`Lib` by default).
pub const ENV_LIBRARY_SUBDIR: &str = "ZSTD_NATIVE_LIBRARY_SUBDIR";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Options controlling how the native library is located and loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// When set, the existence probe always reports the library as present.
    ///
    /// Useful when the hosting environment provides the library through
    /// another mechanism.
    #[serde(default)]
    pub ignore_missing_library: bool,

    /// Root the library tree is resolved against. Defaults to the directory
    /// of the running executable.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Directory under `base_dir` holding the `<platform>-<arch>` folders.
    #[serde(default = "default_library_subdir")]
    pub library_subdir: String,

    /// Search-path policy handed to the dynamic loader.
    #[serde(default)]
    pub search_path: SearchPathPolicy,

    /// How the resolved library gets handed to the dynamic loader.
    #[serde(default)]
    pub load_strategy: LoadStrategy,
}

fn default_library_subdir() -> String {
    "Lib".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            ignore_missing_library: false,
            base_dir: None,
            library_subdir: default_library_subdir(),
            search_path: SearchPathPolicy::default(),
            load_strategy: LoadStrategy::default(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: LoaderConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Find and load configuration by searching up from the given directory.
    ///
    /// Falls back to the defaults when no `zstd-native.toml` exists on the way
    /// to the filesystem root.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `ZSTD_NATIVE_*` environment overrides on top of this config.
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_IGNORE_MISSING_LIBRARY) {
            self.ignore_missing_library = parse_flag(ENV_IGNORE_MISSING_LIBRARY, &value)?;
        }
        if let Some(value) = lookup(ENV_BASE_DIR).filter(|v| !v.is_empty()) {
            self.base_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(ENV_LIBRARY_SUBDIR).filter(|v| !v.is_empty()) {
            self.library_subdir = value;
        }
        Ok(self)
    }

    /// Builder-style toggle for [`LoaderConfig::ignore_missing_library`].
    pub fn ignore_missing_library(mut self, ignore: bool) -> Self {
        self.ignore_missing_library = ignore;
        self
    }

    /// Builder-style setter for [`LoaderConfig::base_dir`].
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Resolve the effective base directory.
    pub fn effective_base_dir(&self) -> std::io::Result<PathBuf> {
        if let Some(dir) = &self.base_dir {
            return Ok(dir.clone());
        }
        let exe = std::env::current_exe()?;
        exe.parent().map(Path::to_path_buf).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("executable '{}' has no parent directory", exe.display()),
            )
        })
    }
}

fn parse_flag(key: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert!(!config.ignore_missing_library);
        assert_eq!(config.base_dir, None);
        assert_eq!(config.library_subdir, "Lib");
        assert_eq!(config.search_path, SearchPathPolicy::Default);
        assert_eq!(config.load_strategy, LoadStrategy::ExplicitPath);
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
ignore_missing_library = true
base_dir = "/opt/app"
search_path = "library-directory"
load_strategy = "search-directory"
"#;
        let config: LoaderConfig = toml::from_str(toml_str).unwrap();
        assert!(config.ignore_missing_library);
        assert_eq!(config.base_dir, Some(PathBuf::from("/opt/app")));
        assert_eq!(config.library_subdir, "Lib");
        assert_eq!(config.search_path, SearchPathPolicy::LibraryDirectory);
        assert_eq!(config.load_strategy, LoadStrategy::SearchDirectory);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: LoaderConfig = toml::from_str("").unwrap();
        assert_eq!(config, LoaderConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_IGNORE_MISSING_LIBRARY, "yes"),
            (ENV_BASE_DIR, "/srv/bin"),
            (ENV_LIBRARY_SUBDIR, "native"),
        ]
        .into_iter()
        .collect();

        let config = LoaderConfig::default()
            .with_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert!(config.ignore_missing_library);
        assert_eq!(config.base_dir, Some(PathBuf::from("/srv/bin")));
        assert_eq!(config.library_subdir, "native");
    }

    #[test]
    fn test_invalid_flag_override() {
        let result = LoaderConfig::default().with_overrides_from(|key| {
            (key == ENV_IGNORE_MISSING_LIBRARY).then(|| "maybe".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: ENV_IGNORE_MISSING_LIBRARY, .. })
        ));
    }

    #[test]
    fn test_save_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = LoaderConfig::default().ignore_missing_library(true);
        config.save(&dir.path().join(CONFIG_FILE_NAME)).unwrap();

        let found = LoaderConfig::find_and_load(&nested).unwrap();
        assert_eq!(found, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = LoaderConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_explicit_base_dir_wins() {
        let config = LoaderConfig::default().base_dir("/data/app");
        assert_eq!(
            config.effective_base_dir().unwrap(),
            PathBuf::from("/data/app")
        );
    }
}
