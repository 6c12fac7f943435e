//! Library Resolver
//!
//! Maps a logical library name to the one file that should be loaded on this
//! host, loads it once and hands out the shared handle afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::loader::{set_dll_directory, DynamicOpener, LibraryOpener, LoadStrategy, NativeLibrary};
use super::LibraryError;
use crate::config::LoaderConfig;
use crate::platform::{OperatingSystem, PlatformDescriptor};

/// Suffix appended to the logical name when the BMI2 build is selected.
pub const BMI2_SUFFIX: &str = "-bmi2";

type Resolution = Result<Arc<NativeLibrary>, LibraryError>;

/// Resolves and loads native libraries, one load per logical name.
pub struct LibraryResolver {
    /// Host the paths are computed for
    platform: PlatformDescriptor,
    /// Loader options
    config: RwLock<LoaderConfig>,
    /// Performs the actual dynamic load
    opener: Arc<dyn LibraryOpener>,
    /// Logical name -> outcome of its first resolution
    cache: Mutex<HashMap<String, Arc<OnceCell<Resolution>>>>,
    /// Whether the Windows DLL directory has been registered
    search_directory_applied: Mutex<bool>,
}

impl LibraryResolver {
    /// Create a resolver for the current host.
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_platform(config, PlatformDescriptor::current())
    }

    /// Create a resolver for an explicit platform.
    pub fn with_platform(config: LoaderConfig, platform: PlatformDescriptor) -> Self {
        Self {
            platform,
            config: RwLock::new(config),
            opener: Arc::new(DynamicOpener),
            cache: Mutex::new(HashMap::new()),
            search_directory_applied: Mutex::new(false),
        }
    }

    /// Replace the component that opens library files.
    pub fn with_opener(mut self, opener: impl LibraryOpener + 'static) -> Self {
        self.opener = Arc::new(opener);
        self
    }

    pub fn platform(&self) -> PlatformDescriptor {
        self.platform
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> LoaderConfig {
        self.config.read().clone()
    }

    /// Replace the configuration.
    ///
    /// Libraries that are already loaded stay loaded; only later first-time
    /// resolutions see the new settings.
    pub fn set_config(&self, config: LoaderConfig) {
        *self.config.write() = config;
    }

    /// Toggle the existence probe override.
    pub fn set_ignore_missing_library(&self, ignore: bool) {
        self.config.write().ignore_missing_library = ignore;
    }

    /// Fail when the host has no shipped library build.
    pub fn check_platform(&self) -> Result<(), LibraryError> {
        if self.platform.is_supported() {
            Ok(())
        } else {
            Err(LibraryError::UnsupportedPlatform {
                os: self.platform.os.tag().to_string(),
                arch: self.platform.arch.tag().to_string(),
            })
        }
    }

    /// `<base dir>/<library subdir>/<platform>-<arch>`.
    pub fn library_directory(&self) -> Result<PathBuf, LibraryError> {
        self.library_directory_with(&self.config.read())
    }

    fn library_directory_with(&self, config: &LoaderConfig) -> Result<PathBuf, LibraryError> {
        let base_dir = config
            .effective_base_dir()
            .map_err(|e| LibraryError::BaseDirectory(e.to_string()))?;
        Ok(base_dir
            .join(&config.library_subdir)
            .join(self.platform.directory_name()))
    }

    /// The logical name with the BMI2 suffix applied when the CPU supports it.
    pub fn variant_name(&self, name: &str) -> String {
        if self.platform.has_bmi2 {
            format!("{}{}", name, BMI2_SUFFIX)
        } else {
            name.to_string()
        }
    }

    /// File name of the library variant, e.g. `libzstd-bmi2.so`.
    pub fn file_name(&self, name: &str) -> Result<String, LibraryError> {
        if name.is_empty() {
            return Err(LibraryError::InvalidLibraryName);
        }
        Ok(format!(
            "{}{}",
            self.variant_name(name),
            self.platform.os.library_extension()
        ))
    }

    /// Full path of the file that [`LibraryResolver::load`] would open.
    pub fn resolve_path(&self, name: &str) -> Result<PathBuf, LibraryError> {
        self.resolve_path_with(&self.config(), name)
    }

    /// Path for `name` under one configuration snapshot.
    pub(super) fn resolve_path_with(
        &self,
        config: &LoaderConfig,
        name: &str,
    ) -> Result<PathBuf, LibraryError> {
        let file_name = self.file_name(name)?;
        let path = self.library_directory_with(config)?.join(file_name);
        debug!(library = name, path = %path.display(), "resolved native library path");
        Ok(path)
    }

    /// Existence probe; never loads anything.
    ///
    /// Always `true` when `ignore_missing_library` is configured.
    pub fn library_exists(&self, name: &str) -> bool {
        self.exists_with(&self.config(), name)
    }

    /// Like [`LibraryResolver::library_exists`], but reports the missing path.
    pub fn ensure_library_exists(&self, name: &str) -> Result<(), LibraryError> {
        let config = self.config();
        if self.exists_with(&config, name) {
            return Ok(());
        }
        Err(LibraryError::LibraryNotFound {
            path: self.resolve_path_with(&config, name)?,
        })
    }

    fn exists_with(&self, config: &LoaderConfig, name: &str) -> bool {
        if config.ignore_missing_library {
            return true;
        }
        self.resolve_path_with(config, name)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Load the library for `name`, resolving it on first use.
    ///
    /// The first outcome, success or failure, is cached: concurrent first
    /// callers block until the single load attempt finishes and all observe
    /// the same result. [`LibraryResolver::reset`] clears the cache.
    pub fn load(&self, name: &str) -> Result<Arc<NativeLibrary>, LibraryError> {
        if name.is_empty() {
            return Err(LibraryError::InvalidLibraryName);
        }

        let cell = {
            let mut cache = self.cache.lock();
            Arc::clone(cache.entry(name.to_string()).or_default())
        };

        if let Some(resolution) = cell.get() {
            debug!(library = name, "native library resolution cached");
            return resolution.clone();
        }

        cell.get_or_init(|| self.resolve_and_load(name, &self.config())).clone()
    }

    /// Names whose first resolution succeeded.
    pub fn loaded_libraries(&self) -> Vec<String> {
        let cache = self.cache.lock();
        let mut names: Vec<String> = cache
            .iter()
            .filter(|(_, cell)| matches!(cell.get(), Some(Ok(_))))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Drop every cached resolution and re-arm the one-time search directory
    /// setup. Meant for tests; outstanding handles keep their library mapped.
    pub fn reset(&self) {
        self.cache.lock().clear();
        *self.search_directory_applied.lock() = false;
    }

    /// One resolution attempt, reading every setting from `config`.
    pub(super) fn resolve_and_load(&self, name: &str, config: &LoaderConfig) -> Resolution {
        if let Err(e) = self.check_platform() {
            warn!(library = name, "{e}; attempting resolution anyway");
        }

        let path = self.resolve_path_with(config, name)?;

        if !config.ignore_missing_library && !path.is_file() {
            return Err(LibraryError::LibraryNotFound { path });
        }

        let target = match config.load_strategy {
            LoadStrategy::SearchDirectory if self.platform.os == OperatingSystem::Windows => {
                let directory = self.library_directory_with(config)?;
                self.apply_search_directory(&directory);
                PathBuf::from(self.file_name(name)?)
            }
            _ => path.clone(),
        };

        debug!(
            library = name,
            target = %target.display(),
            policy = ?config.search_path,
            "loading native library"
        );

        match self.opener.open(&target, config.search_path) {
            Ok(library) => {
                info!(library = name, path = %path.display(), "loaded native library");
                Ok(Arc::new(NativeLibrary::new(path, library)))
            }
            Err(_) if !path.is_file() => Err(LibraryError::LibraryNotFound { path }),
            Err(e) => Err(LibraryError::LibraryLoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    fn apply_search_directory(&self, directory: &Path) {
        let mut applied = self.search_directory_applied.lock();
        if *applied {
            return;
        }
        *applied = true;
        match set_dll_directory(directory) {
            Ok(()) => debug!(directory = %directory.display(), "set DLL search directory"),
            Err(e) => warn!(
                directory = %directory.display(),
                "Failed to set DLL directory: {e}; falling back to the default search order"
            ),
        }
    }
}

static GLOBAL: Lazy<LibraryResolver> = Lazy::new(|| {
    let config = LoaderConfig::default()
        .with_env_overrides()
        .unwrap_or_else(|e| {
            warn!("Ignoring invalid loader environment: {e}");
            LoaderConfig::default()
        });
    LibraryResolver::new(config)
});

/// The process-wide resolver, created on first use.
pub fn global() -> &'static LibraryResolver {
    &GLOBAL
}

/// Replace the process-wide resolver configuration.
pub fn configure(config: LoaderConfig) {
    global().set_config(config);
}
