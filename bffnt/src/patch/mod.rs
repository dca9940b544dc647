//! Rewrite a container from an edited projection
//!
//! Every phase works on one copy of the original bytes and overwrites only
//! the ranges it owns:
//!
//! 1. FINF scalars (1 or 2 bytes each)
//! 2. TGLP safe fields (`cell_width`, `cell_height`, `max_char_width`, `base_line`)
//! 3. CWDH triples of edited glyph indices
//! 4. CMAP Table slots, Scan index fields and Direct offsets
//! 5. An appended override segment plus the FINF CMAP pointer, only for
//!    pairs phase 4 could not express
//! 6. Sheet data of sheets whose samples changed
//!
//! Unknown bytes are never reinterpreted, so a pack with no edits returns
//! the original bytes unchanged.

mod sheets;

pub use sheets::SheetOutcome;

use tracing::{debug, info, warn};

use crate::cmap::build_override_segment;
use crate::cursor::{get_u32, put_u32};
use crate::document::FontDocument;
use crate::error::Result;
use crate::finf::{FinfField, FinfValues};
use crate::font::Font;
use crate::projection::{GlyphEntry, desired_mapping, desired_widths};
use crate::sheet_image::SampleGrid;
use crate::tglp::TglpValues;
use crate::verify::Verification;

/// Per-glyph detail: `info!` when verbose logging was requested, else `debug!`
macro_rules! detail {
    ($verbose:expr, $($arg:tt)*) => {
        if $verbose {
            info!($($arg)*);
        } else {
            debug!($($arg)*);
        }
    };
}

/// Everything a pack may change
#[derive(Debug, Clone, Default)]
pub struct Edits {
    pub finf: FinfValues,
    pub tglp: TglpValues,
    /// `None` (or empty) leaves CWDH and CMAP alone
    pub glyphs: Option<Vec<GlyphEntry>>,
    /// Edit images per sheet index, already in stored orientation
    pub sheets: Vec<Option<SampleGrid>>,
    pub verbose: bool,
}

impl Edits {
    /// Take the editable parts of a document; sheet images are supplied separately
    pub fn from_document(doc: &FontDocument, sheets: Vec<Option<SampleGrid>>, verbose: bool) -> Self {
        Self {
            finf: doc.finf.clone(),
            tglp: doc.tglp.clone(),
            glyphs: Some(doc.glyphs.clone()),
            sheets,
            verbose: verbose || doc.verbose_logs,
        }
    }
}

/// Summary of a rewrite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackReport {
    pub finf_fields: usize,
    pub tglp_fields: usize,
    pub widths_patched: usize,
    pub cmap_pairs_updated: usize,
    /// Offsets of Direct CMAP segments left untouched
    pub direct_segments_skipped: Vec<usize>,
    /// Pairs carried by the appended override segment (0 when none was added)
    pub override_pairs: usize,
    /// Offset of the appended override segment
    pub override_offset: Option<usize>,
    pub sheets: Vec<SheetOutcome>,
    pub verification: Verification,
}

impl PackReport {
    /// Indices of the sheets whose bytes were replaced
    pub fn rewritten_sheets(&self) -> Vec<usize> {
        self.sheets
            .iter()
            .enumerate()
            .filter(|(_, outcome)| **outcome == SheetOutcome::Rewritten)
            .map(|(index, _)| index)
            .collect()
    }
}

/// Produce new container bytes from `original` and `edits`
///
/// Fails only when `original` cannot be decoded or a write lands outside
/// the buffer. Problems confined to one sheet or one Direct segment are
/// reported and skipped.
pub fn apply_edits(original: &[u8], edits: &Edits) -> Result<(Vec<u8>, PackReport)> {
    let font = Font::parse(original)?;
    let order = font.header.byte_order;
    let mut buf = original.to_vec();
    let mut report = PackReport::default();

    for field in FinfField::ALL {
        if let Some(value) = edits.finf.get(field) {
            let stored = font.finf.write_field(&mut buf, field, value, order)?;
            detail!(edits.verbose, "FINF {} = {}", field.name(), stored);
            report.finf_fields += 1;
        }
    }

    report.tglp_fields = font.tglp.write_safe_fields(&mut buf, &edits.tglp, order)?;

    match edits.glyphs.as_deref() {
        Some(glyphs) if !glyphs.is_empty() => {
            patch_glyphs(&mut buf, original, &font, glyphs, edits.verbose, &mut report)?
        }
        _ => warn!("no glyph list; CWDH and CMAP left unchanged"),
    }

    report.sheets = sheets::rewrite_sheets(&mut buf, original, &font, &edits.sheets);
    report.verification = Verification::compare(original, &buf);

    info!(
        "patched {} FINF, {} TGLP fields, {} widths, {} CMAP pairs ({} override), {} sheets rewritten",
        report.finf_fields,
        report.tglp_fields,
        report.widths_patched,
        report.cmap_pairs_updated,
        report.override_pairs,
        report.rewritten_sheets().len()
    );
    if report.verification.is_identical() {
        info!("output is byte-identical to the source (no functional edit)");
    } else {
        debug!(
            "sha256 {} -> {}",
            report.verification.original_hash, report.verification.output_hash
        );
    }

    Ok((buf, report))
}

/// CWDH and CMAP phases
fn patch_glyphs(
    buf: &mut Vec<u8>,
    original: &[u8],
    font: &Font,
    glyphs: &[GlyphEntry],
    verbose: bool,
    report: &mut PackReport,
) -> Result<()> {
    let order = font.header.byte_order;

    let widths = desired_widths(glyphs);
    for (index, width) in &widths {
        if font.widths.get(index) != Some(width) {
            detail!(verbose, "width {} -> {:?}", index, width);
        }
    }
    report.widths_patched = font.cwdh.patch(buf, &widths)?;

    let desired = desired_mapping(glyphs, font.header.platform);
    let stats = font.cmap.patch_in_place(buf, &desired)?;
    report.cmap_pairs_updated = stats.pairs_updated;
    report.direct_segments_skipped = stats.direct_skipped;

    let residual = font.cmap.residual(buf, &desired)?;
    if residual.is_empty() || desired.is_empty() {
        return Ok(());
    }
    for code in &residual {
        detail!(verbose, "U+{:04X} needs the override segment", code);
    }

    let head = buf.len();
    let segment = build_override_segment(&desired, order, font.cmap.wide_codes)?;
    buf.extend_from_slice(&segment);
    font.finf.relink_cmap(buf, head, order)?;
    report.override_pairs = desired.len();
    report.override_offset = Some(head);
    info!(
        "appended CMAP override with {} pairs at 0x{:X} ({} unresolved in place)",
        desired.len(),
        head,
        residual.len()
    );

    if let Some(at) = font.header.file_size_offset() {
        let new_len = buf.len() as u32;
        if get_u32(buf, at, order)? as usize == original.len() {
            put_u32(buf, at, new_len, order)?;
        }
    }
    Ok(())
}
