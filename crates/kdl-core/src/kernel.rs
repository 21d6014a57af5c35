//! Kernel family tags.
//!
//! A kernel library is built for one element-type combination and one target
//! architecture. The host side never sees the kernel's templates, only these
//! tags, which are used to pick a library out of the configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Element types of a GEMM kernel: `A x B -> C`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GemmKind {
    #[serde(rename = "bf16xbf16_to_bf16")]
    Bf16xBf16ToBf16,
    #[serde(rename = "f32xf32_to_f32")]
    F32xF32ToF32,
}

/// Device architecture a kernel was compiled for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "sm80")]
    Sm80,
}

impl GemmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GemmKind::Bf16xBf16ToBf16 => "bf16xbf16_to_bf16",
            GemmKind::F32xF32ToF32 => "f32xf32_to_f32",
        }
    }
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Default => "default",
            Arch::Sm80 => "sm80",
        }
    }
}

impl fmt::Display for GemmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GemmKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bf16xbf16_to_bf16" => Ok(GemmKind::Bf16xBf16ToBf16),
            "f32xf32_to_f32" => Ok(GemmKind::F32xF32ToF32),
            other => Err(format!("unknown GEMM kind: {}", other)),
        }
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Arch::Default),
            "sm80" => Ok(Arch::Sm80),
            other => Err(format!("unknown architecture: {}", other)),
        }
    }
}
