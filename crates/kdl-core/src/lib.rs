pub mod config;
pub mod error;
pub mod kernel;

pub use error::{CoreError, LoadError};
pub use kernel::{Arch, GemmKind};
