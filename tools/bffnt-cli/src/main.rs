//! bffnt - unpack and repack Nintendo binary font containers
//!
//! # Commands
//!
//! - `bffnt unpack` - Decode fonts into `font.json` + sheet PNGs
//! - `bffnt pack` - Write an unpacked folder back into a container
//!
//! # Usage
//!
//! ```bash
//! # Unpack every font in the current directory
//! bffnt unpack
//!
//! # Unpack one font with sheets rotated for easier editing
//! bffnt unpack --rotate180 ui.bffnt
//!
//! # Unpack a whole tree, keeping a base64 copy of each source
//! bffnt unpack --recursive --embed-source assets/fonts
//!
//! # Repack after editing (writes ui/ui.bffnt)
//! bffnt pack ui
//! ```
//!
//! Logging follows `RUST_LOG`; `--verbose` or `BFFNT_VERBOSE=1` raise the
//! default level to debug.

mod pack;
mod unpack;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// bffnt - unpack and repack BFFNT/BCFNT/BRFNT fonts
#[derive(Parser)]
#[command(name = "bffnt")]
#[command(about = "Unpack and repack BFFNT/BCFNT/BRFNT font containers")]
#[command(version)]
struct Cli {
    /// Log per-glyph detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode fonts into font.json + sheet PNGs
    Unpack(unpack::UnpackArgs),

    /// Write an unpacked folder back into a container
    Pack(pack::PackArgs),
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose || bffnt::folder::verbose_from_env();
    init_logging(verbose);

    match cli.command {
        Commands::Unpack(args) => unpack::execute(args),
        Commands::Pack(args) => pack::execute(args, verbose),
    }
}
