use std::ffi::c_void;
use std::ptr;

use serde::Serialize;

/// Launch dimensions. Every component defaults to 1.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Dim3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Dim3 {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Total number of elements (blocks or threads) described.
    pub fn volume(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }
}

impl Default for Dim3 {
    fn default() -> Self {
        Self { x: 1, y: 1, z: 1 }
    }
}

/// GEMM problem shape and operand buffers.
///
/// `a`, `b` and `c` belong to the caller. They are passed through to the
/// kernel's initialization routine unchanged and never dereferenced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arguments {
    pub m: i32,
    pub n: i32,
    pub k: i32,

    pub a: *mut c_void,
    pub b: *mut c_void,
    pub c: *mut c_void,
}

impl Arguments {
    pub fn new(m: i32, n: i32, k: i32, a: *mut c_void, b: *mut c_void, c: *mut c_void) -> Self {
        Self { m, n, k, a, b, c }
    }

    /// Shape only, with null buffers. Enough for capability and geometry queries.
    pub fn shape(m: i32, n: i32, k: i32) -> Self {
        Self::new(m, n, k, ptr::null_mut(), ptr::null_mut(), ptr::null_mut())
    }
}
