//! FFI Module Tests

use super::*;
use crate::config::LoaderConfig;
use crate::platform::{Architecture, OperatingSystem, PlatformDescriptor};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use libloading::Library;
use parking_lot::Mutex;
use tempfile::TempDir;

/// Opener double that hands out the running process image and records every
/// attempt.
#[derive(Clone, Default)]
struct CountingOpener {
    calls: Arc<AtomicUsize>,
    files: Arc<Mutex<Vec<PathBuf>>>,
}

impl CountingOpener {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn files(&self) -> Vec<PathBuf> {
        self.files.lock().clone()
    }
}

impl LibraryOpener for CountingOpener {
    fn open(&self, file: &Path, _policy: SearchPathPolicy) -> Result<Library, libloading::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.files.lock().push(file.to_path_buf());
        this_process()
    }
}

#[cfg(unix)]
fn this_process() -> Result<Library, libloading::Error> {
    Ok(libloading::os::unix::Library::this().into())
}

#[cfg(windows)]
fn this_process() -> Result<Library, libloading::Error> {
    libloading::os::windows::Library::this().map(Into::into)
}

fn linux_x64(has_bmi2: bool) -> PlatformDescriptor {
    PlatformDescriptor::new(OperatingSystem::Linux, Architecture::X64, has_bmi2)
}

fn resolver_in(dir: &TempDir, platform: PlatformDescriptor) -> LibraryResolver {
    LibraryResolver::with_platform(LoaderConfig::default().base_dir(dir.path()), platform)
}

/// Create an empty file where `name` resolves to.
fn touch_library(resolver: &LibraryResolver, name: &str) -> PathBuf {
    let path = resolver.resolve_path(name).unwrap();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, b"").unwrap();
    path
}

#[test]
fn test_library_directory_layout() {
    let dir = TempDir::new().unwrap();
    let cases = [
        (OperatingSystem::Windows, Architecture::X64, "windows-x64"),
        (OperatingSystem::Windows, Architecture::X86, "windows-x86"),
        (OperatingSystem::Windows, Architecture::Arm64, "windows-arm64"),
        (OperatingSystem::Linux, Architecture::X64, "linux-x64"),
        (OperatingSystem::Linux, Architecture::Arm, "linux-arm"),
        (OperatingSystem::Linux, Architecture::S390x, "linux-s390x"),
        (OperatingSystem::MacOs, Architecture::X64, "osx-x64"),
        (OperatingSystem::MacOs, Architecture::Arm64, "osx-arm64"),
    ];

    for (os, arch, expected) in cases {
        let resolver = resolver_in(&dir, PlatformDescriptor::new(os, arch, false));
        assert_eq!(
            resolver.library_directory().unwrap(),
            dir.path().join("Lib").join(expected)
        );
    }
}

#[test]
fn test_library_subdir_is_configurable() {
    let dir = TempDir::new().unwrap();
    let mut config = LoaderConfig::default().base_dir(dir.path());
    config.library_subdir = "native".to_string();
    let resolver = LibraryResolver::with_platform(config, linux_x64(false));

    assert_eq!(
        resolver.library_directory().unwrap(),
        dir.path().join("native").join("linux-x64")
    );
}

#[test]
fn test_file_name_variants() {
    let dir = TempDir::new().unwrap();
    for name in ["libzstd", "libother", "x"] {
        for (os, ext) in [
            (OperatingSystem::Windows, ".dll"),
            (OperatingSystem::Linux, ".so"),
            (OperatingSystem::MacOs, ".dylib"),
            (OperatingSystem::Unsupported, ""),
        ] {
            let plain = resolver_in(&dir, PlatformDescriptor::new(os, Architecture::X64, false));
            assert_eq!(plain.file_name(name).unwrap(), format!("{name}{ext}"));

            let bmi2 = resolver_in(&dir, PlatformDescriptor::new(os, Architecture::X64, true));
            assert_eq!(bmi2.file_name(name).unwrap(), format!("{name}-bmi2{ext}"));
        }
    }
}

#[test]
fn test_resolve_path() {
    let dir = TempDir::new().unwrap();
    let resolver = resolver_in(&dir, linux_x64(true));

    assert_eq!(
        resolver.resolve_path("libzstd").unwrap(),
        dir.path().join("Lib/linux-x64/libzstd-bmi2.so")
    );
}

#[test]
fn test_unsupported_platform_still_resolves() {
    let dir = TempDir::new().unwrap();
    let resolver = resolver_in(
        &dir,
        PlatformDescriptor::new(OperatingSystem::Unsupported, Architecture::Unknown, false),
    );

    assert_eq!(
        resolver.resolve_path("libzstd").unwrap(),
        dir.path().join("Lib/unknown-unknown/libzstd")
    );
    assert!(matches!(
        resolver.check_platform(),
        Err(LibraryError::UnsupportedPlatform { .. })
    ));
    assert!(matches!(
        resolver.load("libzstd"),
        Err(LibraryError::LibraryNotFound { .. })
    ));
}

#[test]
fn test_empty_name_rejected() {
    let dir = TempDir::new().unwrap();
    let resolver = resolver_in(&dir, linux_x64(false));

    assert_eq!(
        resolver.resolve_path(""),
        Err(LibraryError::InvalidLibraryName)
    );
    assert_eq!(
        resolver.load("").unwrap_err(),
        LibraryError::InvalidLibraryName
    );
}

#[test]
fn test_existence_probe() {
    let dir = TempDir::new().unwrap();
    let resolver = resolver_in(&dir, linux_x64(false));

    assert!(!resolver.library_exists("libzstd"));
    resolver.set_ignore_missing_library(true);
    assert!(resolver.library_exists("libzstd"));
    assert!(resolver.ensure_library_exists("libzstd").is_ok());

    resolver.set_ignore_missing_library(false);
    touch_library(&resolver, "libzstd");
    assert!(resolver.library_exists("libzstd"));

    // The other variant is not a substitute
    let bmi2 = resolver_in(&dir, linux_x64(true));
    assert!(!bmi2.library_exists("libzstd"));
}

#[test]
fn test_ensure_library_exists_names_path() {
    let dir = TempDir::new().unwrap();
    let resolver = resolver_in(&dir, linux_x64(false));

    let err = resolver.ensure_library_exists("libzstd").unwrap_err();
    let expected = dir.path().join("Lib/linux-x64/libzstd.so");
    assert_eq!(err.path(), Some(expected.as_path()));
    assert!(err.to_string().contains(&expected.display().to_string()));
    assert!(err.to_string().contains("not corrupted"));
}

#[test]
fn test_missing_library_is_not_found() {
    let dir = TempDir::new().unwrap();

    for ignore in [false, true] {
        let resolver = resolver_in(&dir, linux_x64(false));
        resolver.set_ignore_missing_library(ignore);

        match resolver.load("libzstd") {
            Err(LibraryError::LibraryNotFound { path }) => {
                assert_eq!(path, dir.path().join("Lib/linux-x64/libzstd.so"));
            }
            other => panic!("expected LibraryNotFound, got {other:?}"),
        }
    }
}

#[test]
fn test_missing_library_skips_opener() {
    let dir = TempDir::new().unwrap();
    let opener = CountingOpener::default();
    let resolver = resolver_in(&dir, linux_x64(false)).with_opener(opener.clone());

    assert!(resolver.load("libzstd").is_err());
    assert_eq!(opener.calls(), 0);
}

#[test]
fn test_corrupt_library_fails_to_load() {
    let dir = TempDir::new().unwrap();
    let resolver = resolver_in(&dir, linux_x64(false));
    let path = touch_library(&resolver, "libzstd");
    fs::write(&path, b"definitely not a shared object").unwrap();

    match resolver.load("libzstd") {
        Err(LibraryError::LibraryLoadFailed { path: failed, message }) => {
            assert_eq!(failed, path);
            assert!(!message.is_empty());
        }
        other => panic!("expected LibraryLoadFailed, got {other:?}"),
    }
}

#[test]
fn test_load_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let opener = CountingOpener::default();
    let resolver = resolver_in(&dir, linux_x64(false)).with_opener(opener.clone());
    let path = touch_library(&resolver, "libzstd");

    let first = resolver.load("libzstd").unwrap();
    assert_eq!(first.path(), path);

    // Removing the file proves the second call never looks at the disk
    fs::remove_file(&path).unwrap();
    let second = resolver.load("libzstd").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(opener.calls(), 1);
    assert_eq!(opener.files(), vec![path]);
    assert_eq!(resolver.loaded_libraries(), vec!["libzstd".to_string()]);
}

#[test]
fn test_names_are_cached_independently() {
    let dir = TempDir::new().unwrap();
    let opener = CountingOpener::default();
    let resolver = resolver_in(&dir, linux_x64(false)).with_opener(opener.clone());
    touch_library(&resolver, "libzstd");
    touch_library(&resolver, "libother");

    let zstd = resolver.load("libzstd").unwrap();
    let other = resolver.load("libother").unwrap();

    assert!(!Arc::ptr_eq(&zstd, &other));
    assert_eq!(opener.calls(), 2);
    assert_eq!(
        resolver.loaded_libraries(),
        vec!["libother".to_string(), "libzstd".to_string()]
    );
}

#[test]
fn test_concurrent_first_use_loads_once() {
    let dir = TempDir::new().unwrap();
    let opener = CountingOpener::default();
    let resolver = Arc::new(resolver_in(&dir, linux_x64(false)).with_opener(opener.clone()));
    touch_library(&resolver, "libzstd");

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                resolver.load("libzstd").unwrap()
            })
        })
        .collect();

    let libraries: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(opener.calls(), 1);
    for library in &libraries[1..] {
        assert!(Arc::ptr_eq(&libraries[0], library));
    }
}

#[test]
fn test_concurrent_first_use_shares_failure() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(resolver_in(&dir, linux_x64(false)));

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                resolver.load("libzstd").unwrap_err()
            })
        })
        .collect();

    let errors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for err in &errors {
        assert_eq!(err, &errors[0]);
        assert!(matches!(err, LibraryError::LibraryNotFound { .. }));
    }
}

#[test]
fn test_failure_is_cached_until_reset() {
    let dir = TempDir::new().unwrap();
    let opener = CountingOpener::default();
    let resolver = resolver_in(&dir, linux_x64(false)).with_opener(opener.clone());

    assert!(resolver.load("libzstd").is_err());

    // Installing the library afterwards does not help until a reset
    touch_library(&resolver, "libzstd");
    assert!(matches!(
        resolver.load("libzstd"),
        Err(LibraryError::LibraryNotFound { .. })
    ));
    assert_eq!(opener.calls(), 0);
    assert!(resolver.loaded_libraries().is_empty());

    resolver.reset();
    assert!(resolver.load("libzstd").is_ok());
    assert_eq!(opener.calls(), 1);
}

#[test]
fn test_reset_reloads() {
    let dir = TempDir::new().unwrap();
    let opener = CountingOpener::default();
    let resolver = resolver_in(&dir, linux_x64(false)).with_opener(opener.clone());
    touch_library(&resolver, "libzstd");

    let first = resolver.load("libzstd").unwrap();
    resolver.reset();
    assert!(resolver.loaded_libraries().is_empty());

    let second = resolver.load("libzstd").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(opener.calls(), 2);
}

#[test]
fn test_search_directory_strategy_loads_by_file_name() {
    let dir = TempDir::new().unwrap();
    let opener = CountingOpener::default();
    let mut config = LoaderConfig::default().base_dir(dir.path());
    config.load_strategy = LoadStrategy::SearchDirectory;
    let windows = PlatformDescriptor::new(OperatingSystem::Windows, Architecture::X64, true);
    let resolver = LibraryResolver::with_platform(config, windows).with_opener(opener.clone());
    let path = touch_library(&resolver, "libzstd");

    // Setting the directory cannot succeed off Windows; the load continues
    let library = resolver.load("libzstd").unwrap();

    assert_eq!(library.path(), path);
    assert_eq!(opener.files(), vec![PathBuf::from("libzstd-bmi2.dll")]);
}

#[test]
fn test_search_directory_strategy_ignored_off_windows() {
    let dir = TempDir::new().unwrap();
    let opener = CountingOpener::default();
    let mut config = LoaderConfig::default().base_dir(dir.path());
    config.load_strategy = LoadStrategy::SearchDirectory;
    let resolver =
        LibraryResolver::with_platform(config, linux_x64(false)).with_opener(opener.clone());
    let path = touch_library(&resolver, "libzstd");

    resolver.load("libzstd").unwrap();
    assert_eq!(opener.files(), vec![path]);
}

#[test]
fn test_missing_symbol() {
    let dir = TempDir::new().unwrap();
    let resolver = resolver_in(&dir, linux_x64(false)).with_opener(CountingOpener::default());
    touch_library(&resolver, "libzstd");

    let library = resolver.load("libzstd").unwrap();
    assert!(!library.has_symbol("ZSTD_symbol_that_does_not_exist"));

    let err = unsafe { library.symbol::<extern "C" fn()>("ZSTD_symbol_that_does_not_exist") }
        .unwrap_err();
    match err {
        LibraryError::SymbolNotFound { symbol, path, .. } => {
            assert_eq!(symbol, "ZSTD_symbol_that_does_not_exist");
            assert_eq!(path, library.path());
        }
        other => panic!("expected SymbolNotFound, got {other:?}"),
    }
}

#[test]
fn test_config_swap() {
    let dir = TempDir::new().unwrap();
    let resolver = resolver_in(&dir, linux_x64(false));
    assert!(!resolver.config().ignore_missing_library);

    resolver.set_config(LoaderConfig::default().base_dir("/elsewhere"));
    assert_eq!(
        resolver.library_directory().unwrap(),
        PathBuf::from("/elsewhere/Lib/linux-x64")
    );
}

#[test]
fn test_resolution_reads_one_config_snapshot() {
    let old_dir = TempDir::new().unwrap();
    let new_dir = TempDir::new().unwrap();
    let opener = CountingOpener::default();
    let resolver = resolver_in(&new_dir, linux_x64(false)).with_opener(opener.clone());
    let new_path = touch_library(&resolver, "libzstd");

    // A load that took its snapshot before the swap stays on the old settings
    let snapshot = LoaderConfig::default().base_dir(old_dir.path());
    resolver.set_config(
        LoaderConfig::default()
            .base_dir(new_dir.path())
            .ignore_missing_library(true),
    );
    let old_path = resolver.resolve_path_with(&snapshot, "libzstd").unwrap();
    assert!(old_path.starts_with(old_dir.path()));

    match resolver.resolve_and_load("libzstd", &snapshot) {
        Err(LibraryError::LibraryNotFound { path }) => assert_eq!(path, old_path),
        other => panic!("expected LibraryNotFound, got {other:?}"),
    }
    assert_eq!(opener.calls(), 0);

    // And the other way round: the live config never leaks into the snapshot
    let snapshot = resolver.config();
    resolver.set_config(LoaderConfig::default().base_dir(old_dir.path()));
    let library = resolver.resolve_and_load("libzstd", &snapshot).unwrap();
    assert_eq!(library.path(), new_path);
    assert_eq!(opener.files(), vec![new_path]);
}
