//! In-process stand-in for a kernel library.
//!
//! The "exported" functions are Rust `extern "C"` functions with the same
//! signatures a kernel toolchain emits, so adaptors built on top of
//! [`MockLoader`] call real code through real function pointers.

#![allow(dead_code)]

pub mod fixture;

use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use kdl_adaptor::dl_opened::{
    BLOCK_DIM_SYMBOL, CAN_IMPLEMENT_SYMBOL, INITIALIZE_SYMBOL, KERNEL_SYMBOL,
    SHARED_MEMORY_BYTES_SYMBOL, THREAD_DIM_SYMBOL,
};
use kdl_adaptor::{DynamicLoader, RawSymbol};

pub const TILE_M: i32 = 32;
pub const TILE_N: i32 = 32;
pub const TILE_K: i32 = 16;
pub const SHARED_MEMORY_BYTES: i32 = 16384;

/// Parameter layout written by [`mock_initialize`].
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MockParams {
    pub m: i32,
    pub n: i32,
    pub k: i32,
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub device_sms: i32,
    pub sm_occupancy: i32,
}

pub unsafe extern "C" fn mock_block_dim(m: i32, n: i32, _k: i32, x: *mut u32, y: *mut u32, z: *mut u32) {
    unsafe {
        *x = (m / TILE_M) as u32;
        *y = (n / TILE_N) as u32;
        *z = 1;
    }
}

pub unsafe extern "C" fn mock_thread_dim(x: *mut u32, y: *mut u32, z: *mut u32) {
    unsafe {
        *x = 128;
        *y = 1;
        *z = 1;
    }
}

pub unsafe extern "C" fn mock_shared_memory_bytes() -> i32 {
    SHARED_MEMORY_BYTES
}

/// Accepts only tile-aligned shapes.
pub unsafe extern "C" fn mock_can_implement_aligned(m: i32, n: i32, k: i32) -> bool {
    m > 0 && n > 0 && k > 0 && m % TILE_M == 0 && n % TILE_N == 0 && k % TILE_K == 0
}

/// Accepts any non-empty shape.
pub unsafe extern "C" fn mock_can_implement_any(m: i32, n: i32, k: i32) -> bool {
    m > 0 && n > 0 && k > 0
}

pub unsafe extern "C" fn mock_initialize(
    params: *mut c_void,
    m: i32,
    n: i32,
    k: i32,
    a: *mut c_void,
    b: *mut c_void,
    c: *mut c_void,
    device_sms: i32,
    sm_occupancy: i32,
) {
    let params = params as *mut MockParams;
    unsafe {
        *params = MockParams {
            m,
            n,
            k,
            a: a as usize,
            b: b as usize,
            c: c as usize,
            device_sms,
            sm_occupancy,
        };
    }
}

pub static MOCK_DEVICE_ENTRY: u8 = 0;

pub unsafe extern "C" fn mock_kernel_symbol() -> *mut c_void {
    &MOCK_DEVICE_ENTRY as *const u8 as *mut c_void
}

pub fn mock_device_entry() -> *mut c_void {
    &MOCK_DEVICE_ENTRY as *const u8 as *mut c_void
}

/// Symbols "exported" by a mock library, by name.
#[derive(Debug, Clone, Default)]
pub struct MockLibrary {
    symbols: HashMap<String, usize>,
}

impl MockLibrary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All six symbols, accepting only tile-aligned shapes.
    pub fn full() -> Self {
        Self::empty()
            .with(BLOCK_DIM_SYMBOL, mock_block_dim as *const ())
            .with(THREAD_DIM_SYMBOL, mock_thread_dim as *const ())
            .with(SHARED_MEMORY_BYTES_SYMBOL, mock_shared_memory_bytes as *const ())
            .with(CAN_IMPLEMENT_SYMBOL, mock_can_implement_aligned as *const ())
            .with(INITIALIZE_SYMBOL, mock_initialize as *const ())
            .with(KERNEL_SYMBOL, mock_kernel_symbol as *const ())
    }

    /// All six symbols, accepting any shape.
    pub fn permissive() -> Self {
        Self::full().with(CAN_IMPLEMENT_SYMBOL, mock_can_implement_any as *const ())
    }

    /// Only the device kernel symbol.
    pub fn device_only() -> Self {
        Self::empty().with(KERNEL_SYMBOL, mock_kernel_symbol as *const ())
    }

    pub fn with(mut self, name: &str, address: *const ()) -> Self {
        self.symbols.insert(name.to_string(), address as usize);
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.symbols.remove(name);
        self
    }
}

/// [`DynamicLoader`] serving [`MockLibrary`] values by path.
#[derive(Debug, Default)]
pub struct MockLoader {
    libraries: HashMap<PathBuf, MockLibrary>,
    opens: AtomicUsize,
    lookups: AtomicUsize,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(mut self, path: impl Into<PathBuf>, library: MockLibrary) -> Self {
        self.libraries.insert(path.into(), library);
        self
    }

    /// Number of open attempts, successful or not.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of symbol lookups, successful or not.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl DynamicLoader for MockLoader {
    type Library = MockLibrary;

    fn open(&self, path: &Path) -> Result<Self::Library, String> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.libraries.get(path).cloned().ok_or_else(|| {
            format!("{}: cannot open shared object file: No such file or directory", path.display())
        })
    }

    fn symbol(&self, library: &Self::Library, name: &str) -> Option<RawSymbol> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        library
            .symbols
            .get(name)
            .and_then(|&address| NonNull::new(address as *mut c_void))
    }
}
