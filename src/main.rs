//! zstd-native - Native zstd Library Probe
//!
//! Command-line entry point for inspecting how the native library resolves on
//! this host and for exercising the loaded library.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};
use zstd_native::ffi;
use zstd_native::zstd::{
    CParameter, CompressionContext, DecompressionContext, DecompressionStream, ErrorCode,
    ZstdApi,
};
use zstd_native::{LoaderConfig, Zstd, ZstdError, LIBRARY_NAME};

#[derive(Parser)]
#[command(name = "zstd-native")]
#[command(version)]
#[command(about = "Locate, load and exercise the native zstd library", long_about = None)]
struct Cli {
    /// Loader config file (default: nearest zstd-native.toml above the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the Lib/ tree (default: directory of this executable)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file in one shot
    Compress {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Compression level
        #[arg(short, long, default_value = "3", allow_hyphen_values = true)]
        level: i32,
    },

    /// Decompress a zstd file
    Decompress {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the platform and the path the library resolves to
    Info,

    /// Load the library and print what it reports
    Load,

    /// Check that the library file exists without loading it
    Probe {
        /// Report the library as present regardless of the file system
        #[arg(long)]
        ignore_missing: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.base_dir)?;
    ffi::configure(config);

    match cli.command {
        Commands::Compress {
            input,
            output,
            level,
        } => cmd_compress(&input, &output, level),
        Commands::Decompress { input, output } => cmd_decompress(&input, &output),
        Commands::Info => cmd_info(),
        Commands::Load => cmd_load(),
        Commands::Probe { ignore_missing } => cmd_probe(ignore_missing),
    }
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>, base_dir: Option<PathBuf>) -> Result<LoaderConfig> {
    let config = match path {
        Some(path) => LoaderConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            LoaderConfig::find_and_load(&cwd).context("Failed to load config")?
        }
    };
    let mut config = config
        .with_env_overrides()
        .context("Invalid ZSTD_NATIVE_* environment")?;
    if let Some(dir) = base_dir {
        config.base_dir = Some(dir);
    }
    Ok(config)
}

fn cmd_info() -> Result<()> {
    let resolver = ffi::global();
    let platform = resolver.platform();

    println!("Platform:  {}", platform);
    println!(
        "Supported: {}",
        if platform.is_supported() { "yes" } else { "no" }
    );
    println!(
        "Directory: {}",
        resolver
            .library_directory()
            .context("Failed to compute library directory")?
            .display()
    );
    println!(
        "Library:   {}",
        resolver
            .resolve_path(LIBRARY_NAME)
            .context("Failed to resolve library path")?
            .display()
    );

    Ok(())
}

fn cmd_probe(ignore_missing: bool) -> Result<()> {
    let resolver = ffi::global();
    if ignore_missing {
        resolver.set_ignore_missing_library(true);
    }

    resolver
        .ensure_library_exists(LIBRARY_NAME)
        .context("Library probe failed")?;

    let path = resolver.resolve_path(LIBRARY_NAME)?;
    if path.is_file() {
        println!("present: {}", path.display());
    } else {
        println!("present (ignored): {}", path.display());
    }

    Ok(())
}

fn cmd_load() -> Result<()> {
    let start = Instant::now();
    let zstd = Zstd::load().context("Failed to load native library")?;
    let elapsed = start.elapsed();

    println!("Loaded {} in {:?}", zstd.library().path().display(), elapsed);
    println!("Entry points:     {}", ZstdApi::SYMBOLS.len());
    println!(
        "Levels:           {}..={}",
        zstd.min_c_level(),
        zstd.max_c_level()
    );
    println!(
        "CStream in/out:   {} / {}",
        zstd.c_stream_in_size(),
        zstd.c_stream_out_size()
    );
    println!(
        "DStream in/out:   {} / {}",
        zstd.d_stream_in_size(),
        zstd.d_stream_out_size()
    );

    Ok(())
}

fn cmd_compress(input: &Path, output: &Path, level: i32) -> Result<()> {
    let data = fs::read(input).context("Failed to read input file")?;
    let zstd = Zstd::load().context("Failed to load native library")?;

    let bounds = zstd.c_param_bounds(CParameter::CompressionLevel)?;
    if !bounds.contains(level) {
        bail!(
            "Compression level {} outside {}..={}",
            level,
            bounds.lower_bound,
            bounds.upper_bound
        );
    }

    let mut cctx = CompressionContext::new(&zstd)?;
    let compressed = cctx
        .compress_to_vec(&data, level)
        .context("Compression failed")?;

    fs::write(output, &compressed).context("Failed to write output")?;
    println!(
        "Compressed {} -> {} bytes to {}",
        data.len(),
        compressed.len(),
        output.display()
    );

    Ok(())
}

fn cmd_decompress(input: &Path, output: &Path) -> Result<()> {
    let data = fs::read(input).context("Failed to read input file")?;
    let zstd = Zstd::load().context("Failed to load native library")?;

    let mut dctx = DecompressionContext::new(&zstd)?;
    let decompressed = match dctx.decompress_to_vec(&data) {
        Ok(decompressed) => decompressed,
        // Streamed frames may omit their size, and a file may hold several
        // frames; the stream decoder handles both in bounded chunks
        Err(e) if needs_streaming(&e) => {
            debug!(reason = %e, "Falling back to streaming decompression");
            DecompressionStream::new(&zstd)?
                .decompress_all(&data)
                .context("Decompression failed")?
        }
        Err(e) => return Err(e).context("Decompression failed"),
    };

    fs::write(output, &decompressed).context("Failed to write output")?;
    println!(
        "Decompressed {} -> {} bytes to {}",
        data.len(),
        decompressed.len(),
        output.display()
    );

    Ok(())
}

fn needs_streaming(err: &ZstdError) -> bool {
    matches!(
        err,
        ZstdError::ContentSizeUnknown | ZstdError::ContentSizeTooLarge(_)
    ) || err.code() == Some(ErrorCode::DstSizeTooSmall)
}
