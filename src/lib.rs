//! zstd-native - Run-time Bindings to the Native zstd Library
//!
//! Exposes the C ABI of a pre-built zstd shared library to Rust. Nothing is
//! linked at build time: the library is located on disk and loaded on first
//! use, picking the build that matches the host.
//!
//! # Features
//!
//! - **Platform-aware resolution**: `Lib/<platform>-<arch>/<name><ext>` under the
//!   application directory, for Windows, Linux and macOS
//! - **CPU variant selection**: the `-bmi2` build is chosen on CPUs with BMI2
//! - **Load once**: one load attempt per library name per process, shared by
//!   every caller, with a reset hook for tests
//! - **Typed entry points**: every declared zstd symbol as an `extern "C"`
//!   function pointer, plus slice-based call forms
//! - **RAII contexts**: compression, decompression, dictionary and stream
//!   objects that free themselves on drop
//!
//! # Example
//!
//! ```no_run
//! use zstd_native::zstd::{CompressionContext, DecompressionContext};
//!
//! let zstd = zstd_native::zstd()?;
//!
//! let mut cctx = CompressionContext::new(&zstd)?;
//! let compressed = cctx.compress_to_vec(b"hello hello hello", 3)?;
//!
//! let mut dctx = DecompressionContext::new(&zstd)?;
//! assert_eq!(dctx.decompress_to_vec(&compressed)?, b"hello hello hello");
//! # Ok::<(), zstd_native::ZstdError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   LoaderConfig  │  defaults, zstd-native.toml, ZSTD_NATIVE_* env
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ LibraryResolver │  platform + BMI2 -> one path, cached per name
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  NativeLibrary  │  libloading handle
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────────┐
//! │ Zstd / ZstdApi      │  entry points, RAII contexts
//! └─────────────────────┘
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod cpu_detect;
pub mod ffi;
pub mod platform;
pub mod zstd;

// Re-export commonly used types
pub use config::{ConfigError, ConfigResult, LoaderConfig};
pub use ffi::{LibraryError, LibraryResolver, NativeLibrary};
pub use platform::{Architecture, OperatingSystem, PlatformDescriptor};
pub use zstd::{Zstd, ZstdError, ZstdResult, LIBRARY_NAME};

/// Load the native zstd library through the process-wide resolver.
pub fn zstd() -> Result<Zstd, LibraryError> {
    Zstd::load()
}

/// Whether the native zstd library for this host is present on disk.
///
/// Always `true` when the loader is configured to ignore a missing library.
pub fn library_exists() -> bool {
    ffi::global().library_exists(LIBRARY_NAME)
}

/// Fail with [`LibraryError::LibraryNotFound`] when the library is absent.
pub fn ensure_library_exists() -> Result<(), LibraryError> {
    ffi::global().ensure_library_exists(LIBRARY_NAME)
}
