//! Pack command - write an unpacked folder back into a container

use std::path::PathBuf;

use anyhow::Result;
use bffnt::{PackOptions, PngSheetIo, SheetOutcome, pack_folder};
use clap::Args;

/// Arguments for the pack command
#[derive(Args)]
pub struct PackArgs {
    /// Folder containing font.json and sheet PNGs
    pub folder: PathBuf,

    /// Output font file (default: <folder>/<source_file>)
    pub output: Option<PathBuf>,
}

/// Execute the pack command
pub fn execute(args: PackArgs, verbose: bool) -> Result<()> {
    let opts = PackOptions {
        output: args.output,
        verbose,
    };
    let outcome = pack_folder(&args.folder, &opts, &PngSheetIo)?;
    let report = &outcome.report;

    println!("Packed: {}", outcome.output.display());
    println!("  FINF fields: {}", report.finf_fields);
    println!("  TGLP fields: {}", report.tglp_fields);
    println!("  Widths: {}", report.widths_patched);
    println!("  CMAP pairs updated: {}", report.cmap_pairs_updated);
    if let Some(offset) = report.override_offset {
        println!(
            "  CMAP override: {} pairs at 0x{:X}",
            report.override_pairs, offset
        );
    }
    for offset in &report.direct_segments_skipped {
        println!("  Direct segment at 0x{:X} left unchanged", offset);
    }
    for (index, sheet) in report.sheets.iter().enumerate() {
        let status = match sheet {
            SheetOutcome::Missing => "no image".to_string(),
            SheetOutcome::Unchanged => "unchanged".to_string(),
            SheetOutcome::Rewritten => "re-encoded".to_string(),
            SheetOutcome::Skipped(e) => format!("kept original ({})", e),
        };
        println!("  Sheet {}: {}", index, status);
    }
    println!("  SHA256 source: {}", report.verification.original_hash);
    println!("  SHA256 output: {}", report.verification.output_hash);
    if report.verification.is_identical() {
        println!("  Output is byte-identical to the source (no functional edit)");
    }
    Ok(())
}
