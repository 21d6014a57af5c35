use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use kdl_core::config::{KdlConfig, KernelEntry};
use kdl_core::{Arch, GemmKind, LoadError};
use tracing::{info, warn};

use crate::adaptor::Adaptor;
use crate::dim::Arguments;
use crate::dl_opened::{DlOpenedAdaptor, DlOpenedDeviceKernel};
use crate::platform::{DynamicLoader, SystemLoader};

/// A configured kernel with both halves loaded.
#[derive(Debug, Clone)]
pub struct RegisteredKernel {
    pub name: String,
    pub kind: GemmKind,
    pub arch: Arch,
    pub adaptor: Arc<DlOpenedAdaptor>,
    pub device: Arc<DlOpenedDeviceKernel>,
}

/// Kernels loaded from a [`KdlConfig`], in configuration order.
///
/// Each library path is opened at most once per registry, however many
/// entries refer to it. The library caches can be filled from several
/// threads through [`load_adaptor`](Self::load_adaptor) and
/// [`load_device_kernel`](Self::load_device_kernel); appending kernels needs
/// `&mut self`. Dropping the registry does not unload anything.
#[derive(Debug, Default)]
pub struct KernelRegistry {
    kernels: Vec<RegisteredKernel>,
    adaptors: DashMap<PathBuf, Arc<DlOpenedAdaptor>>,
    devices: DashMap<PathBuf, Arc<DlOpenedDeviceKernel>>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every kernel in `config` with the system loader.
    pub fn load(config: &KdlConfig) -> Self {
        Self::load_with(&SystemLoader, config)
    }

    /// Load every kernel in `config`. Entries that fail to load are skipped.
    pub fn load_with<L: DynamicLoader>(loader: &L, config: &KdlConfig) -> Self {
        let mut registry = Self::new();
        for entry in &config.kernels {
            if let Err(e) = registry.register(loader, entry) {
                warn!("skipping kernel {}: {}", entry.name, e);
            }
        }
        info!(
            "kernel registry ready: {} of {} kernels loaded",
            registry.len(),
            config.kernels.len()
        );
        registry
    }

    /// Load one entry and append it to the registry.
    pub fn register<L: DynamicLoader>(
        &mut self,
        loader: &L,
        entry: &KernelEntry,
    ) -> Result<&RegisteredKernel, LoadError> {
        let adaptor = self.load_adaptor(loader, &entry.library)?;
        let device = self.load_device_kernel(loader, entry.device_library())?;

        self.kernels.push(RegisteredKernel {
            name: entry.name.clone(),
            kind: entry.kind,
            arch: entry.arch,
            adaptor,
            device,
        });
        let index = self.kernels.len() - 1;
        Ok(&self.kernels[index])
    }

    /// Host adaptor for `path`, opening the library on first use.
    pub fn load_adaptor<L: DynamicLoader>(
        &self,
        loader: &L,
        path: &Path,
    ) -> Result<Arc<DlOpenedAdaptor>, LoadError> {
        Self::cached(&self.adaptors, path, |path| {
            DlOpenedAdaptor::try_load_with(loader, path)
        })
    }

    /// Device kernel for `path`, opening the library on first use.
    pub fn load_device_kernel<L: DynamicLoader>(
        &self,
        loader: &L,
        path: &Path,
    ) -> Result<Arc<DlOpenedDeviceKernel>, LoadError> {
        Self::cached(&self.devices, path, |path| {
            DlOpenedDeviceKernel::try_load_with(loader, path)
        })
    }

    // The shard stays locked while loading, so racing callers for the same
    // path wait for the first load instead of opening the library again.
    fn cached<T>(
        cache: &DashMap<PathBuf, Arc<T>>,
        path: &Path,
        load: impl FnOnce(&Path) -> Result<T, LoadError>,
    ) -> Result<Arc<T>, LoadError> {
        let entry = cache
            .entry(path.to_path_buf())
            .or_try_insert_with(|| load(path).map(Arc::new))?;
        Ok(Arc::clone(entry.value()))
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredKernel> {
        self.kernels.iter().find(|k| k.name == name)
    }

    /// First kernel of the given family that can implement `args`.
    pub fn select(&self, kind: GemmKind, arch: Arch, args: &Arguments) -> Option<&RegisteredKernel> {
        self.kernels
            .iter()
            .filter(|k| k.kind == kind && k.arch == arch)
            .find(|k| k.adaptor.can_implement(args))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredKernel> {
        self.kernels.iter()
    }

    /// Number of distinct host libraries behind registered kernels.
    pub fn library_count(&self) -> usize {
        self.kernels
            .iter()
            .map(|k| k.adaptor.path())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }
}
