use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use kdl_adaptor::{
    Adaptor, Arguments, DeviceKernel, DlOpenedAdaptor, DlOpenedDeviceKernel, KernelRegistry,
    LaunchGeometry, SystemLoader,
};
use kdl_common::platform;
use kdl_core::config::{default_config_path, KdlConfig};
use kdl_core::{Arch, GemmKind};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "kdl")]
#[command(about = "KDL - inspect GEMM kernels loaded from shared libraries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct Shape {
    /// Rows of A and C
    #[arg(short)]
    m: i32,

    /// Columns of B and C
    #[arg(short)]
    n: i32,

    /// Columns of A, rows of B
    #[arg(short)]
    k: i32,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a kernel library and report its launch geometry for a shape
    Probe {
        /// Library exporting the host-side adaptor functions
        #[arg(short, long)]
        library: PathBuf,

        /// Library exporting the device kernel symbol
        #[arg(short, long)]
        device_library: Option<PathBuf>,

        #[command(flatten)]
        shape: Shape,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the kernels in a configuration file and whether they load
    List {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Pick the configured kernel that would run a shape
    Select {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Kernel element types (bf16xbf16_to_bf16, f32xf32_to_f32)
        #[arg(long)]
        kind: GemmKind,

        /// Target architecture (default, sm80)
        #[arg(long, default_value = "default")]
        arch: Arch,

        #[command(flatten)]
        shape: Shape,
    },
}

#[derive(Serialize)]
struct ProbeReport {
    platform: &'static str,
    library: PathBuf,
    m: i32,
    n: i32,
    k: i32,
    can_implement: bool,
    geometry: Option<LaunchGeometry>,
    device_library: Option<PathBuf>,
    device_symbol: Option<String>,
}

fn main() -> anyhow::Result<()> {
    kdl_common::init_logging();

    let cli = Cli::parse();

    if !platform::supports_dynamic_loading() {
        warn!(
            "dynamic loading is not available on {}; every kernel library will fail to load",
            platform::platform_name()
        );
    }

    match cli.command {
        Commands::Probe {
            library,
            device_library,
            shape,
            json,
        } => probe(&library, device_library.as_deref(), shape, json),
        Commands::List { config } => list(&load_config(config)?),
        Commands::Select {
            config,
            kind,
            arch,
            shape,
        } => select(&load_config(config)?, kind, arch, shape),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<KdlConfig> {
    let path = path.unwrap_or_else(default_config_path);
    info!("using configuration {}", path.display());
    KdlConfig::load(&path).with_context(|| format!("failed to load {}", path.display()))
}

fn probe(
    library: &Path,
    device_library: Option<&Path>,
    shape: Shape,
    json: bool,
) -> anyhow::Result<()> {
    let adaptor = DlOpenedAdaptor::try_load_with(&SystemLoader, library)?;
    let args = Arguments::shape(shape.m, shape.n, shape.k);

    let device_symbol = match device_library {
        Some(path) => {
            let kernel = DlOpenedDeviceKernel::try_load_with(&SystemLoader, path)?;
            Some(format!("{:p}", kernel.symbol()))
        }
        None => None,
    };

    let report = ProbeReport {
        platform: platform::platform_name(),
        library: library.to_path_buf(),
        m: shape.m,
        n: shape.n,
        k: shape.k,
        can_implement: adaptor.can_implement(&args),
        geometry: adaptor.launch_geometry(&args),
        device_library: device_library.map(Path::to_path_buf),
        device_symbol,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("library:        {}", report.library.display());
    println!("shape:          {} x {} x {}", report.m, report.n, report.k);
    println!("can implement:  {}", report.can_implement);
    if let Some(geometry) = &report.geometry {
        let b = geometry.block_dim;
        let t = geometry.thread_dim;
        match geometry.cluster_dim {
            Some(c) => println!("cluster dim:    ({}, {}, {})", c.x, c.y, c.z),
            None => println!("cluster dim:    none"),
        }
        println!("block dim:      ({}, {}, {}) = {} blocks", b.x, b.y, b.z, b.volume());
        println!("thread dim:     ({}, {}, {}) = {} threads", t.x, t.y, t.z, t.volume());
        println!("shared memory:  {} bytes", geometry.shared_memory_bytes);
    }
    if let (Some(path), Some(symbol)) = (&report.device_library, &report.device_symbol) {
        println!("device symbol:  {} ({})", symbol, path.display());
    }
    Ok(())
}

fn list(config: &KdlConfig) -> anyhow::Result<()> {
    let registry = KernelRegistry::load(config);
    for entry in &config.kernels {
        let status = if registry.get(&entry.name).is_some() { "ok" } else { "FAILED" };
        println!(
            "{:<24} {:<18} {:<8} {:<6} {}",
            entry.name,
            entry.kind,
            entry.arch,
            status,
            entry.library.display()
        );
    }
    println!(
        "{} of {} kernels loaded from {} libraries",
        registry.len(),
        config.kernels.len(),
        registry.library_count()
    );
    Ok(())
}

fn select(config: &KdlConfig, kind: GemmKind, arch: Arch, shape: Shape) -> anyhow::Result<()> {
    let registry = KernelRegistry::load(config);
    let args = Arguments::shape(shape.m, shape.n, shape.k);

    let kernel = registry.select(kind, arch, &args).with_context(|| {
        format!(
            "no {} kernel for {} can implement {} x {} x {}",
            kind, arch, shape.m, shape.n, shape.k
        )
    })?;

    println!("{} ({})", kernel.name, kernel.adaptor.path().display());
    if let Some(geometry) = kernel.adaptor.launch_geometry(&args) {
        println!("{}", serde_json::to_string_pretty(&geometry)?);
    }
    Ok(())
}
