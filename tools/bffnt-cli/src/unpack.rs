//! Unpack command - decode fonts into editable folders

use std::path::PathBuf;

use anyhow::{Result, bail};
use bffnt::{PngSheetIo, UnpackOptions, is_font_file, unpack_batch};
use clap::Args;
use tracing::{error, warn};
use walkdir::WalkDir;

/// Arguments for the unpack command
#[derive(Args)]
pub struct UnpackArgs {
    /// Font files or directories to scan (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Rotate sheet PNGs by 180 degrees
    #[arg(long)]
    pub rotate180: bool,

    /// Mirror sheet PNGs top to bottom
    #[arg(long)]
    pub flip_y: bool,

    /// Scan directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Store a base64 copy of the source font in font.json
    #[arg(long)]
    pub embed_source: bool,
}

/// Font files named directly or found under the given directories
fn collect_targets(paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let roots: Vec<PathBuf> = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths.to_vec()
    };

    let mut targets = Vec::new();
    for root in &roots {
        if root.is_file() {
            if is_font_file(root) {
                targets.push(root.clone());
            } else {
                warn!("skipping {}: not a .bffnt/.bcfnt/.brfnt file", root.display());
            }
            continue;
        }
        if !root.is_dir() {
            warn!("skipping {}: no such file or directory", root.display());
            continue;
        }

        let walker = WalkDir::new(root).max_depth(if recursive { usize::MAX } else { 1 });
        let mut found: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && is_font_file(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        targets.extend(found);
    }
    targets
}

/// Execute the unpack command
pub fn execute(args: UnpackArgs) -> Result<()> {
    let targets = collect_targets(&args.paths, args.recursive);
    if targets.is_empty() {
        bail!("No .bffnt/.bcfnt/.brfnt files found");
    }

    let opts = UnpackOptions {
        rotate180: args.rotate180,
        flip_y: args.flip_y,
        embed_source: args.embed_source,
    };

    let results = unpack_batch(&targets, &opts, &PngSheetIo);

    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(folder) => println!("  {} -> {}", path.display(), folder.display()),
            Err(e) => {
                error!("{}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }

    println!();
    println!("Unpacked: {} ok, {} failed", results.len() - failed, failed);
    if failed > 0 {
        bail!("{} of {} files failed to unpack", failed, results.len());
    }
    Ok(())
}
