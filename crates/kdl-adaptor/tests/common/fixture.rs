//! Real kernel libraries for tests that go through the system loader.
//!
//! `tests/fixtures/test-kernel` is a cdylib exporting the adaptor symbols.
//! It lives outside the workspace and is built on first use into this test
//! target's scratch directory.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

/// Which build of the fixture library to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKernel {
    /// Exports all six symbols.
    Full,
    /// Exports everything except `__xla_can_implement`.
    NoCanImplement,
}

impl TestKernel {
    fn feature(self) -> Option<&'static str> {
        match self {
            TestKernel::Full => None,
            TestKernel::NoCanImplement => Some("no-can-implement"),
        }
    }

    fn target_dir(self) -> PathBuf {
        let name = match self {
            TestKernel::Full => "test-kernel-full",
            TestKernel::NoCanImplement => "test-kernel-no-can-implement",
        };
        Path::new(env!("CARGO_TARGET_TMPDIR")).join(name)
    }
}

/// Path of the built fixture library, building it if needed.
pub fn test_kernel_library(kernel: TestKernel) -> &'static Path {
    static FULL: OnceLock<PathBuf> = OnceLock::new();
    static NO_CAN_IMPLEMENT: OnceLock<PathBuf> = OnceLock::new();

    let cell = match kernel {
        TestKernel::Full => &FULL,
        TestKernel::NoCanImplement => &NO_CAN_IMPLEMENT,
    };
    cell.get_or_init(|| build(kernel))
}

fn build(kernel: TestKernel) -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("test-kernel")
        .join("Cargo.toml");
    let target_dir = kernel.target_dir();

    let mut cmd = Command::new(env!("CARGO"));
    cmd.arg("build")
        .arg("--quiet")
        .arg("--offline")
        .arg("--manifest-path")
        .arg(&manifest)
        .arg("--target-dir")
        .arg(&target_dir);
    if let Some(feature) = kernel.feature() {
        cmd.arg("--features").arg(feature);
    }

    let output = cmd.output().expect("failed to run cargo for the test kernel");
    assert!(
        output.status.success(),
        "building {} failed:\n{}",
        manifest.display(),
        String::from_utf8_lossy(&output.stderr)
    );

    let library = target_dir.join("debug").join(format!(
        "{}kdl_test_kernel{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    ));
    assert!(library.exists(), "missing {}", library.display());
    library
}
