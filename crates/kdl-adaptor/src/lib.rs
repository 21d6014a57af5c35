//! Host-side adaptors for GEMM kernels compiled by a separate toolchain.
//!
//! A kernel library exports a handful of plain C functions; this crate
//! resolves them at run time and exposes them through the [`Adaptor`] and
//! [`DeviceKernel`] traits, so callers never touch raw function pointers.

pub mod adaptor;
pub mod dim;
pub mod dl_opened;
pub mod platform;
pub mod registry;

pub use adaptor::{Adaptor, DeviceKernel, LaunchGeometry};
pub use dim::{Arguments, Dim3};
pub use dl_opened::{DlOpenedAdaptor, DlOpenedDeviceKernel};
pub use platform::{DynamicLoader, RawSymbol, SystemLoader};
pub use registry::{KernelRegistry, RegisteredKernel};
