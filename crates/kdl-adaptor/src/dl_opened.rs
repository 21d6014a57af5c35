//! Adaptor backed by a kernel library opened at run time.
//!
//! The library exports plain C functions under fixed names. Their signatures
//! are a convention shared with the kernel toolchain: only the presence of a
//! symbol is checked on load, a library exporting a name with a different
//! signature is undefined behavior once that function is called.
//!
//! | Symbol                      | Signature                                                        |
//! |-----------------------------|------------------------------------------------------------------|
//! | `__xla_block_dim`           | `void(i32 m, i32 n, i32 k, u32* x, u32* y, u32* z)`              |
//! | `__xla_thread_dim`          | `void(u32* x, u32* y, u32* z)`                                   |
//! | `__xla_shared_memory_bytes` | `i32()`                                                          |
//! | `__xla_can_implement`       | `bool(i32 m, i32 n, i32 k)`                                      |
//! | `__xla_initialize`          | `void(void* params, i32 m, i32 n, i32 k, void* a, void* b, void* c, i32 device_sms, i32 sm_occupancy)` |
//! | `__xla_kernel_symbol`       | `void*()`                                                        |
//!
//! Libraries are never unloaded. Kernels from them may still be referenced by
//! launches in flight or cached by the driver, and there is no point at which
//! that can be ruled out locally.

use std::any::Any;
use std::ffi::c_void;
use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};

use kdl_core::LoadError;
use tracing::{debug, error, info};

use crate::adaptor::{Adaptor, DeviceKernel};
use crate::dim::{Arguments, Dim3};
use crate::platform::{DynamicLoader, SystemLoader};

pub const BLOCK_DIM_SYMBOL: &str = "__xla_block_dim";
pub const THREAD_DIM_SYMBOL: &str = "__xla_thread_dim";
pub const SHARED_MEMORY_BYTES_SYMBOL: &str = "__xla_shared_memory_bytes";
pub const CAN_IMPLEMENT_SYMBOL: &str = "__xla_can_implement";
pub const INITIALIZE_SYMBOL: &str = "__xla_initialize";
pub const KERNEL_SYMBOL: &str = "__xla_kernel_symbol";

/// Host-side symbols, in resolution order.
pub const ADAPTOR_SYMBOLS: [&str; 5] = [
    BLOCK_DIM_SYMBOL,
    THREAD_DIM_SYMBOL,
    SHARED_MEMORY_BYTES_SYMBOL,
    CAN_IMPLEMENT_SYMBOL,
    INITIALIZE_SYMBOL,
];

type BlockDimFn =
    unsafe extern "C" fn(m: i32, n: i32, k: i32, x: *mut u32, y: *mut u32, z: *mut u32);
type ThreadDimFn = unsafe extern "C" fn(x: *mut u32, y: *mut u32, z: *mut u32);
type SharedMemoryBytesFn = unsafe extern "C" fn() -> i32;
type CanImplementFn = unsafe extern "C" fn(m: i32, n: i32, k: i32) -> bool;
type InitializeFn = unsafe extern "C" fn(
    params: *mut c_void,
    m: i32,
    n: i32,
    k: i32,
    a: *mut c_void,
    b: *mut c_void,
    c: *mut c_void,
    device_sms: i32,
    sm_occupancy: i32,
);
type KernelSymbolFn = unsafe extern "C" fn() -> *mut c_void;

/// An open library that stays mapped for the rest of the process.
type LibraryHandle = &'static (dyn Any + Send + Sync);

fn leak_library<T: Send + Sync + 'static>(library: T) -> LibraryHandle {
    Box::leak(Box::new(library))
}

fn open_library<L: DynamicLoader>(loader: &L, path: &Path) -> Result<L::Library, LoadError> {
    loader.open(path).map_err(|reason| {
        debug!("failed to open kernel library {}: {}", path.display(), reason);
        LoadError::LibraryOpen {
            path: path.to_path_buf(),
            reason,
        }
    })
}

struct Resolver<'a, L: DynamicLoader> {
    loader: &'a L,
    library: &'a L::Library,
    path: &'a Path,
}

impl<L: DynamicLoader> Resolver<'_, L> {
    /// Resolve `name` and reinterpret its address as the function pointer `F`.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type; calling it is only sound if the
    /// library exports `name` with exactly that signature.
    unsafe fn resolve<F: Copy>(&self, name: &'static str) -> Result<F, LoadError> {
        debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*mut c_void>());
        match self.loader.symbol(self.library, name) {
            Some(symbol) => Ok(unsafe { mem::transmute_copy::<*mut c_void, F>(&symbol.as_ptr()) }),
            None => {
                error!(
                    symbol = name,
                    library = %self.path.display(),
                    "failed to resolve kernel adaptor function"
                );
                Err(LoadError::MissingSymbol {
                    symbol: name,
                    path: self.path.to_path_buf(),
                })
            }
        }
    }
}

//===----------------------------------------------------------------------===//
// Host side
//===----------------------------------------------------------------------===//

/// [`Adaptor`] whose functions were resolved from a shared library.
///
/// Only ever constructed with all five functions present.
pub struct DlOpenedAdaptor {
    _library: LibraryHandle,
    path: PathBuf,
    block_dim_fn: BlockDimFn,
    thread_dim_fn: ThreadDimFn,
    shared_memory_bytes_fn: SharedMemoryBytesFn,
    can_implement_fn: CanImplementFn,
    initialize_fn: InitializeFn,
}

impl DlOpenedAdaptor {
    /// Load an adaptor from the shared library at `path`.
    ///
    /// Returns `None` if the library can't be opened or any of the adaptor
    /// functions is missing; missing functions are logged.
    pub fn load(path: impl AsRef<Path>) -> Option<Self> {
        Self::try_load_with(&SystemLoader, path).ok()
    }

    /// Like [`load`](Self::load), but reports why loading failed and uses
    /// `loader` to open the library.
    pub fn try_load_with<L: DynamicLoader>(
        loader: &L,
        path: impl AsRef<Path>,
    ) -> Result<Self, LoadError> {
        let path = path.as_ref();
        debug!("loading kernel adaptor from a shared library: {}", path.display());

        let library = open_library(loader, path)?;
        let resolver = Resolver {
            loader,
            library: &library,
            path,
        };

        // SAFETY: the function types follow the symbol contract in the module docs.
        let (block_dim_fn, thread_dim_fn, shared_memory_bytes_fn, can_implement_fn, initialize_fn) = unsafe {
            (
                resolver.resolve::<BlockDimFn>(BLOCK_DIM_SYMBOL)?,
                resolver.resolve::<ThreadDimFn>(THREAD_DIM_SYMBOL)?,
                resolver.resolve::<SharedMemoryBytesFn>(SHARED_MEMORY_BYTES_SYMBOL)?,
                resolver.resolve::<CanImplementFn>(CAN_IMPLEMENT_SYMBOL)?,
                resolver.resolve::<InitializeFn>(INITIALIZE_SYMBOL)?,
            )
        };

        info!("loaded kernel adaptor from: {}", path.display());
        Ok(Self {
            _library: leak_library(library),
            path: path.to_path_buf(),
            block_dim_fn,
            thread_dim_fn,
            shared_memory_bytes_fn,
            can_implement_fn,
            initialize_fn,
        })
    }

    /// Library the adaptor was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Adaptor for DlOpenedAdaptor {
    fn cluster_dim(&self) -> Option<Dim3> {
        None
    }

    fn block_dim(&self, m: i32, n: i32, k: i32) -> Dim3 {
        let mut dim = Dim3::default();
        unsafe { (self.block_dim_fn)(m, n, k, &mut dim.x, &mut dim.y, &mut dim.z) };
        dim
    }

    fn thread_dim(&self) -> Dim3 {
        let mut dim = Dim3::default();
        unsafe { (self.thread_dim_fn)(&mut dim.x, &mut dim.y, &mut dim.z) };
        dim
    }

    fn shared_memory_bytes(&self) -> i32 {
        unsafe { (self.shared_memory_bytes_fn)() }
    }

    fn can_implement(&self, args: &Arguments) -> bool {
        unsafe { (self.can_implement_fn)(args.m, args.n, args.k) }
    }

    unsafe fn initialize(
        &self,
        params: *mut c_void,
        args: &Arguments,
        device_sms: i32,
        sm_occupancy: i32,
    ) {
        // SAFETY: the caller guarantees `params` fits this kernel's parameters.
        unsafe {
            (self.initialize_fn)(
                params,
                args.m,
                args.n,
                args.k,
                args.a,
                args.b,
                args.c,
                device_sms,
                sm_occupancy,
            )
        }
    }
}

impl fmt::Debug for DlOpenedAdaptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DlOpenedAdaptor")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

//===----------------------------------------------------------------------===//
// Device side
//===----------------------------------------------------------------------===//

/// [`DeviceKernel`] whose entry point is fetched from a shared library.
pub struct DlOpenedDeviceKernel {
    _library: LibraryHandle,
    path: PathBuf,
    kernel_symbol_fn: KernelSymbolFn,
}

impl DlOpenedDeviceKernel {
    pub fn load(path: impl AsRef<Path>) -> Option<Self> {
        Self::try_load_with(&SystemLoader, path).ok()
    }

    pub fn try_load_with<L: DynamicLoader>(
        loader: &L,
        path: impl AsRef<Path>,
    ) -> Result<Self, LoadError> {
        let path = path.as_ref();
        debug!("loading device kernel from a shared library: {}", path.display());

        let library = open_library(loader, path)?;
        let resolver = Resolver {
            loader,
            library: &library,
            path,
        };
        // SAFETY: `__xla_kernel_symbol` is `void*()` by contract.
        let kernel_symbol_fn = unsafe { resolver.resolve::<KernelSymbolFn>(KERNEL_SYMBOL)? };

        Ok(Self {
            _library: leak_library(library),
            path: path.to_path_buf(),
            kernel_symbol_fn,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DeviceKernel for DlOpenedDeviceKernel {
    fn symbol(&self) -> *mut c_void {
        unsafe { (self.kernel_symbol_fn)() }
    }
}

impl fmt::Debug for DlOpenedDeviceKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DlOpenedDeviceKernel")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
