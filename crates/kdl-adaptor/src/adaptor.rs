use std::ffi::c_void;

use serde::Serialize;

use crate::dim::{Arguments, Dim3};

/// Everything needed to size a kernel launch, apart from the parameter buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LaunchGeometry {
    pub cluster_dim: Option<Dim3>,
    pub block_dim: Dim3,
    pub thread_dim: Dim3,
    pub shared_memory_bytes: i32,
}

/// Type-erased host-side view of a GEMM kernel.
///
/// At run time device kernel parameters are just a bag of bytes handed to the
/// driver, so the kernel's templates stay inside the library that was built
/// by the device toolchain. Implementors only expose what a launch needs.
pub trait Adaptor {
    /// Cluster shape, or `None` when the kernel does not group blocks into clusters.
    fn cluster_dim(&self) -> Option<Dim3>;

    /// Grid dimensions for a problem of shape `m x n x k`.
    fn block_dim(&self, m: i32, n: i32, k: i32) -> Dim3;

    /// Per-block thread dimensions, fixed when the kernel was compiled.
    fn thread_dim(&self) -> Dim3;

    /// Dynamic shared memory the launch must reserve.
    fn shared_memory_bytes(&self) -> i32;

    /// Whether the kernel can execute the given problem shape.
    ///
    /// Nothing else checks shape compatibility; call this before a launch.
    fn can_implement(&self, args: &Arguments) -> bool;

    /// Write the kernel's launch parameters into `params`.
    ///
    /// # Safety
    ///
    /// `params` must point to writable memory at least as large as the
    /// parameter structure of this particular kernel, suitably aligned for
    /// it. The size is a contract between the caller and the kernel and is
    /// not known to the adaptor.
    unsafe fn initialize(
        &self,
        params: *mut c_void,
        args: &Arguments,
        device_sms: i32,
        sm_occupancy: i32,
    );

    /// Launch geometry for `args`, or `None` if the kernel cannot implement it.
    fn launch_geometry(&self, args: &Arguments) -> Option<LaunchGeometry> {
        if !self.can_implement(args) {
            return None;
        }
        Some(LaunchGeometry {
            cluster_dim: self.cluster_dim(),
            block_dim: self.block_dim(args.m, args.n, args.k),
            thread_dim: self.thread_dim(),
            shared_memory_bytes: self.shared_memory_bytes(),
        })
    }
}

/// Device side of a kernel, kept apart from [`Adaptor`] so host and device
/// code can be compiled and shipped separately.
pub trait DeviceKernel {
    /// Opaque handle of the kernel's device entry point.
    fn symbol(&self) -> *mut c_void;
}
