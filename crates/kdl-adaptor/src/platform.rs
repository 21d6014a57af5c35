//! Indirection over the platform's dynamic loader.
//!
//! Uses `libloading` on unix and windows. Other targets get a loader that
//! fails every open, which callers see as "no adaptor" rather than a crash.

use std::ffi::c_void;
use std::path::Path;
use std::ptr::NonNull;

/// Address of a resolved symbol. Its type is known only by convention.
pub type RawSymbol = NonNull<c_void>;

/// The two primitives a kernel loader needs: open a library, look up a name.
pub trait DynamicLoader {
    /// An open library. Dropping it may unload the library.
    type Library: Send + Sync + 'static;

    /// Open the shared library at `path`.
    fn open(&self, path: &Path) -> Result<Self::Library, String>;

    /// Resolve `name` in an open library. `None` if it is not exported.
    fn symbol(&self, library: &Self::Library, name: &str) -> Option<RawSymbol>;
}

/// Loader backed by the operating system (`dlopen`/`LoadLibrary`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLoader;

#[cfg(any(unix, windows))]
impl DynamicLoader for SystemLoader {
    type Library = libloading::Library;

    fn open(&self, path: &Path) -> Result<Self::Library, String> {
        // SAFETY: opening a library runs its initializers. Kernel libraries
        // are trusted to be well behaved on load.
        unsafe { libloading::Library::new(path) }.map_err(|e| e.to_string())
    }

    fn symbol(&self, library: &Self::Library, name: &str) -> Option<RawSymbol> {
        // SAFETY: the symbol is read as a plain address and never dereferenced here.
        let symbol = unsafe { library.get::<*mut c_void>(name.as_bytes()) }.ok()?;
        NonNull::new(*symbol)
    }
}

#[cfg(not(any(unix, windows)))]
impl DynamicLoader for SystemLoader {
    type Library = ();

    fn open(&self, _path: &Path) -> Result<Self::Library, String> {
        Err("dynamic loading is not supported on this platform".to_string())
    }

    fn symbol(&self, _library: &Self::Library, _name: &str) -> Option<RawSymbol> {
        None
    }
}
