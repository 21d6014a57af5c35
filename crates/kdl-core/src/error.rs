use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a kernel library could not be turned into an adaptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open kernel library {}: {reason}", path.display())]
    LibraryOpen { path: PathBuf, reason: String },

    #[error("failed to resolve kernel adaptor function {symbol} in library: {}", path.display())]
    MissingSymbol { symbol: &'static str, path: PathBuf },
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            LoadError::LibraryOpen { path, .. } => path,
            LoadError::MissingSymbol { path, .. } => path,
        }
    }
}
