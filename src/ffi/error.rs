//! Library Resolution Errors

use std::path::PathBuf;

use thiserror::Error;

/// Error type for native library resolution and loading.
///
/// `Clone` so a cached failure can be handed to every caller that asks for
/// the same library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    /// No file exists at the resolved path.
    #[error(
        "Native library not found at '{}'. Make sure that the library exists and is not corrupted!",
        .path.display()
    )]
    LibraryNotFound { path: PathBuf },

    /// The file exists but the OS loader rejected it.
    #[error(
        "Failed while loading library from this path: '{}' ({message}). Make sure that the library exists and is not corrupted!",
        .path.display()
    )]
    LibraryLoadFailed { path: PathBuf, message: String },

    /// The host OS or architecture has no shipped library build.
    #[error("Unsupported platform: {os}-{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// A declared entry point is missing from the loaded library.
    #[error("Symbol '{symbol}' not found in '{}': {message}", .path.display())]
    SymbolNotFound {
        symbol: String,
        path: PathBuf,
        message: String,
    },

    /// Logical library names must be non-empty.
    #[error("Library name must not be empty")]
    InvalidLibraryName,

    /// The application base directory could not be determined.
    #[error("Cannot determine application base directory: {0}")]
    BaseDirectory(String),
}

impl LibraryError {
    /// Path the failing resolution attempted, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            LibraryError::LibraryNotFound { path }
            | LibraryError::LibraryLoadFailed { path, .. }
            | LibraryError::SymbolNotFound { path, .. } => Some(path),
            _ => None,
        }
    }
}
