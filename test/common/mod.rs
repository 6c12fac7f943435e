//! Shared helpers for tests that need a real libzstd.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use zstd_native::{LibraryResolver, LoaderConfig, LIBRARY_NAME};

/// Points at a libzstd to use instead of searching the usual locations.
pub const TEST_LIBRARY_ENV: &str = "ZSTD_NATIVE_TEST_LIBRARY";

const HOST_CANDIDATES: &[&str] = &[
    "/usr/lib/x86_64-linux-gnu/libzstd.so.1",
    "/lib/x86_64-linux-gnu/libzstd.so.1",
    "/usr/lib/aarch64-linux-gnu/libzstd.so.1",
    "/lib/aarch64-linux-gnu/libzstd.so.1",
    "/usr/lib64/libzstd.so.1",
    "/usr/lib/libzstd.so.1",
    "/usr/local/lib/libzstd.so.1",
    "/opt/homebrew/lib/libzstd.dylib",
    "/usr/local/lib/libzstd.dylib",
];

/// A libzstd installed on this machine, if any.
pub fn host_libzstd() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(TEST_LIBRARY_ENV).map(PathBuf::from) {
        return path.is_file().then_some(path);
    }
    HOST_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

/// Copy the host libzstd to where the current platform resolves it under
/// `base_dir`. Returns the installed path, or `None` without a host library.
pub fn install_host_library(base_dir: &Path) -> Option<PathBuf> {
    let source = host_libzstd()?;
    let resolver = LibraryResolver::new(LoaderConfig::default().base_dir(base_dir));
    let target = resolver.resolve_path(LIBRARY_NAME).ok()?;
    fs::create_dir_all(target.parent()?).ok()?;
    fs::copy(&source, &target).ok()?;
    Some(target)
}

/// Compressible sample text.
pub fn sample_text(len: usize) -> Vec<u8> {
    b"The quick brown fox jumps over the lazy dog. "
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}
