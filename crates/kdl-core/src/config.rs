use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;
use crate::kernel::{Arch, GemmKind};

/// Top-level KDL configuration, loaded from kdl.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KdlConfig {
    /// Kernel libraries available to the registry, in selection order
    #[serde(default)]
    pub kernels: Vec<KernelEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelEntry {
    /// Unique name used to look the kernel up
    pub name: String,
    /// Element types the kernel was instantiated for
    pub kind: GemmKind,
    /// Target architecture
    #[serde(default)]
    pub arch: Arch,
    /// Shared library exporting the host-side adaptor functions
    pub library: PathBuf,
    /// Shared library exporting the device kernel symbol (None = `library`)
    pub device_library: Option<PathBuf>,
}

impl KernelEntry {
    /// Library the device kernel symbol is resolved from.
    pub fn device_library(&self) -> &Path {
        self.device_library.as_deref().unwrap_or(&self.library)
    }
}

impl KdlConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        debug!("loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        let config: KdlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file if it exists, otherwise return defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let mut names = HashSet::new();
        for entry in &self.kernels {
            if entry.name.is_empty() {
                return Err(CoreError::ConfigError("kernel name must not be empty".into()));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(CoreError::ConfigError(format!(
                    "duplicate kernel name: {}",
                    entry.name
                )));
            }
            if entry.library.as_os_str().is_empty() {
                return Err(CoreError::ConfigError(format!(
                    "kernel {} has an empty library path",
                    entry.name
                )));
            }
            if matches!(&entry.device_library, Some(p) if p.as_os_str().is_empty()) {
                return Err(CoreError::ConfigError(format!(
                    "kernel {} has an empty device library path",
                    entry.name
                )));
            }
        }
        Ok(())
    }
}

/// Returns the default config file path based on platform conventions.
/// Search order:
/// 1. System-wide config: `%PROGRAMDATA%\KDL\kdl.toml` (Windows) or `/etc/kdl/kdl.toml` (Linux/macOS)
/// 2. Local fallback: `./kdl.toml`
pub fn default_config_path() -> PathBuf {
    #[cfg(windows)]
    {
        let programdata = std::env::var("PROGRAMDATA")
            .unwrap_or_else(|_| r"C:\ProgramData".to_string());
        let system_path = PathBuf::from(format!(r"{}\KDL\kdl.toml", programdata));
        if system_path.exists() {
            return system_path;
        }
    }
    #[cfg(not(windows))]
    {
        let system_path = Path::new("/etc/kdl/kdl.toml");
        if system_path.exists() {
            return system_path.to_path_buf();
        }
    }
    PathBuf::from("kdl.toml")
}
