//! FFI Module
//!
//! Locates and loads the native zstd shared library at run time.
//!
//! # Architecture
//!
//! ```text
//! zstd_native::zstd()
//!       │
//!       ▼
//! LibraryResolver (platform + CPU features -> one file path, cached per name)
//!       │
//!       ▼
//! LibraryOpener (libloading)
//!       │
//!       ▼
//! NativeLibrary -> ZstdApi entry point table
//! ```
//!
//! # Layout
//!
//! Libraries are expected at
//! `<app base dir>/Lib/<platform>-<arch>/<name>[-bmi2]<ext>`, for example
//! `Lib/linux-x64/libzstd-bmi2.so`. The `-bmi2` build is picked whenever the
//! CPU reports BMI2; there is no fallback to the baseline build.
//!
//! # Example
//!
//! ```no_run
//! use zstd_native::ffi::{self, LibraryResolver};
//! use zstd_native::LoaderConfig;
//!
//! let resolver = LibraryResolver::new(LoaderConfig::default().base_dir("/opt/app"));
//! println!("{}", resolver.resolve_path("libzstd")?.display());
//!
//! // Or through the process-wide instance
//! let library = ffi::global().load("libzstd")?;
//! println!("loaded {}", library.path().display());
//! # Ok::<(), zstd_native::LibraryError>(())
//! ```

mod error;
mod loader;
mod resolver;

pub use error::LibraryError;
pub use loader::{DynamicOpener, LibraryOpener, LoadStrategy, NativeLibrary, SearchPathPolicy};
pub use resolver::{configure, global, LibraryResolver, BMI2_SUFFIX};

#[cfg(test)]
mod tests;
