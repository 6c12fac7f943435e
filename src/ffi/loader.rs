//! Dynamic Library Loader
//!
//! Safe wrapper around libloading for loading the native zstd library.

use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::LibraryError;
use crate::zstd::ZstdApi;

/// Where the OS loader may look for the library's own dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchPathPolicy {
    /// The loader's default behaviour.
    #[default]
    Default,
    /// Prefer the directory the library itself lives in.
    ///
    /// On Windows this is `LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR` plus the default
    /// directories. Unix loaders have no such scoping; the library is opened
    /// with `RTLD_NOW` so unresolved dependencies fail at load time.
    LibraryDirectory,
    /// Only the system directory (Windows), `RTLD_NOW` elsewhere.
    System,
}

/// How the resolved library gets handed to the dynamic loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStrategy {
    /// Load the fully resolved path.
    #[default]
    ExplicitPath,
    /// Register the library directory with the OS loader once, then load by
    /// file name. Only Windows honours the override; other systems fall back
    /// to [`LoadStrategy::ExplicitPath`].
    SearchDirectory,
}

/// Opens shared libraries on behalf of the resolver.
///
/// The default implementation is [`DynamicOpener`]. Tests plug in their own
/// to observe load attempts.
pub trait LibraryOpener: Send + Sync {
    /// Open `file` (a full path, or a bare file name under
    /// [`LoadStrategy::SearchDirectory`]).
    fn open(&self, file: &Path, policy: SearchPathPolicy) -> Result<Library, libloading::Error>;
}

/// [`LibraryOpener`] backed by the host's dynamic loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicOpener;

impl LibraryOpener for DynamicOpener {
    fn open(&self, file: &Path, policy: SearchPathPolicy) -> Result<Library, libloading::Error> {
        // Safety: loading a library runs its initialisers. The resolver only
        // ever hands us paths inside the application's own library tree.
        unsafe { open_with_policy(file, policy) }
    }
}

#[cfg(unix)]
unsafe fn open_with_policy(
    file: &Path,
    policy: SearchPathPolicy,
) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LOCAL, RTLD_NOW};

    match policy {
        SearchPathPolicy::Default => Library::new(file),
        SearchPathPolicy::LibraryDirectory | SearchPathPolicy::System => {
            UnixLibrary::open(Some(file), RTLD_NOW | RTLD_LOCAL).map(Into::into)
        }
    }
}

#[cfg(windows)]
unsafe fn open_with_policy(
    file: &Path,
    policy: SearchPathPolicy,
) -> Result<Library, libloading::Error> {
    use libloading::os::windows::{
        Library as WindowsLibrary, LOAD_LIBRARY_SEARCH_DEFAULT_DIRS,
        LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR, LOAD_LIBRARY_SEARCH_SYSTEM32,
    };

    let flags = match policy {
        SearchPathPolicy::Default => return Library::new(file),
        SearchPathPolicy::LibraryDirectory => {
            LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR | LOAD_LIBRARY_SEARCH_DEFAULT_DIRS
        }
        SearchPathPolicy::System => LOAD_LIBRARY_SEARCH_SYSTEM32,
    };
    WindowsLibrary::load_with_flags(file, flags).map(Into::into)
}

#[cfg(not(any(unix, windows)))]
unsafe fn open_with_policy(
    file: &Path,
    _policy: SearchPathPolicy,
) -> Result<Library, libloading::Error> {
    Library::new(file)
}

/// Point the Windows DLL search path at `dir` for the whole process.
///
/// `SetDllDirectoryW` is bound through libloading so no extra system crate is
/// needed.
#[cfg(windows)]
pub(crate) fn set_dll_directory(dir: &Path) -> Result<(), String> {
    use std::os::windows::ffi::OsStrExt;

    type SetDllDirectoryW = unsafe extern "system" fn(*const u16) -> i32;

    let wide: Vec<u16> = dir.as_os_str().encode_wide().chain(Some(0)).collect();

    // Safety: kernel32 is always mapped and SetDllDirectoryW has this
    // signature on every supported Windows version.
    unsafe {
        let kernel32 = Library::new("kernel32.dll").map_err(|e| e.to_string())?;
        let set_directory = kernel32
            .get::<SetDllDirectoryW>(b"SetDllDirectoryW\0")
            .map_err(|e| e.to_string())?;
        if set_directory(wide.as_ptr()) == 0 {
            return Err(std::io::Error::last_os_error().to_string());
        }
    }
    Ok(())
}

#[cfg(not(windows))]
pub(crate) fn set_dll_directory(_dir: &Path) -> Result<(), String> {
    Err("the DLL search directory can only be set on Windows".to_string())
}

/// A loaded native library.
///
/// Owned by the resolver cache and shared as `Arc`; the library stays mapped
/// for as long as any clone is alive.
pub struct NativeLibrary {
    /// Path the library was resolved to
    path: PathBuf,
    /// The loaded library handle
    library: Library,
    /// Entry point table, bound on first use
    zstd: OnceCell<ZstdApi>,
}

impl NativeLibrary {
    pub(crate) fn new(path: PathBuf, library: Library) -> Self {
        Self {
            path,
            library,
            zstd: OnceCell::new(),
        }
    }

    /// Get the path to this library
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a symbol and copy it out as `T`.
    ///
    /// # Safety
    ///
    /// `T` must match the actual type of the exported symbol, and the returned
    /// value must not be used after this library is dropped.
    pub unsafe fn symbol<T: Copy>(&self, name: &str) -> Result<T, LibraryError> {
        let symbol = self
            .library
            .get::<T>(name.as_bytes())
            .map_err(|e| LibraryError::SymbolNotFound {
                symbol: name.to_string(),
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        Ok(*symbol)
    }

    /// Whether the library exports `name`.
    pub fn has_symbol(&self, name: &str) -> bool {
        // Safety: the pointer is only inspected, never called.
        unsafe { self.library.get::<*const ()>(name.as_bytes()).is_ok() }
    }

    /// The zstd entry point table, bound once per library.
    ///
    /// Crate-private: the copied table must not outlive the library, which
    /// only the `Zstd` handle guarantees.
    pub(crate) fn zstd(&self) -> Result<ZstdApi, LibraryError> {
        self.zstd
            .get_or_try_init(|| {
                // Safety: ZstdApi::bind declares every symbol with its C
                // signature.
                unsafe { ZstdApi::bind(self) }
            })
            .copied()
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .field("zstd_bound", &self.zstd.get().is_some())
            .finish()
    }
}
