use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use rasterprint_engine::config::CapabilityRequest;
use rasterprint_engine::logging::{LoggingConfig, init_logging};
use rasterprint_engine::probe::{self, ProbeConfig};

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Backend {
    All,
    Vulkan,
    Metal,
    Dx12,
    Gl,
}

impl Backend {
    fn backends(self) -> wgpu::Backends {
        match self {
            Backend::All => wgpu::Backends::all(),
            Backend::Vulkan => wgpu::Backends::VULKAN,
            Backend::Metal => wgpu::Backends::METAL,
            Backend::Dx12 => wgpu::Backends::DX12,
            Backend::Gl => wgpu::Backends::GL,
        }
    }
}

/// Renders the fingerprint scene off-screen and writes it as PNG.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Output image path.
    #[arg(short, long, default_value = "rasterprint.png")]
    output: PathBuf,

    #[arg(long, default_value_t = 250)]
    width: u32,

    #[arg(long, default_value_t = 250)]
    height: u32,

    /// Exact bits per red, green and blue channel.
    #[arg(long, default_value_t = 8)]
    color_bits: u32,

    /// Exact alpha channel bits; 2 with `--color-bits 10` asks for 10/10/10/2.
    #[arg(long, default_value_t = 8)]
    alpha_bits: u32,

    /// Minimum depth buffer bits.
    #[arg(long, default_value_t = 0)]
    depth_bits: u32,

    /// Minimum stencil buffer bits.
    #[arg(long, default_value_t = 0)]
    stencil_bits: u32,

    #[arg(long, value_enum, default_value_t = Backend::All)]
    backend: Backend,

    /// Use a software adapter when one is available.
    #[arg(long)]
    software: bool,

    /// env_logger filter; overrides RUST_LOG.
    #[arg(long)]
    log: Option<String>,
}

impl Args {
    fn probe_config(&self) -> ProbeConfig {
        let mut config = ProbeConfig {
            width: self.width,
            height: self.height,
            request: CapabilityRequest::new(
                self.color_bits,
                self.color_bits,
                self.color_bits,
                self.alpha_bits,
                self.depth_bits,
                self.stencil_bits,
            ),
            ..ProbeConfig::default()
        };
        config.gpu.backends = self.backend.backends();
        config.gpu.force_fallback_adapter = self.software;
        config
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        ..LoggingConfig::default()
    });

    let capture = probe::capture(&args.probe_config())?;

    println!("renderer: {}", capture.device.renderer);
    println!("vendor:   {}", capture.device.vendor);
    println!("version:  {}", capture.device.version);
    println!(
        "config:   rgba {}/{}/{}/{} depth {} stencil {} samples {}",
        capture.config.red,
        capture.config.green,
        capture.config.blue,
        capture.config.alpha,
        capture.config.depth,
        capture.config.stencil,
        capture.config.samples
    );

    capture
        .image
        .save_png(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    log::info!("wrote {}", args.output.display());
    Ok(())
}
