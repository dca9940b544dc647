//! Sheet phase: re-encode only the sheets whose samples changed
//!
//! Re-encoding is lossy (see `gx2_tex`), so a sheet whose edit image matches
//! the decoded original is never rewritten.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::SheetError;
use crate::font::Font;
use crate::sheet_image::SampleGrid;

/// What happened to one sheet during a pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetOutcome {
    /// No edit image was supplied
    Missing,
    /// Edit image matches the original samples
    Unchanged,
    /// Sheet bytes were re-encoded and replaced
    Rewritten,
    /// Edit image could not be applied; the sheet keeps its original bytes
    Skipped(SheetError),
}

/// Decide the new bytes for sheet `index`, if any
fn plan_sheet(
    original: &[u8],
    font: &Font,
    index: usize,
    image: Option<&SampleGrid>,
) -> (SheetOutcome, Option<Vec<u8>>) {
    let Some(image) = image else {
        return (SheetOutcome::Missing, None);
    };

    let expected = (font.tglp.sheet_width as u32, font.tglp.sheet_height as u32);
    if image.dimensions() != expected {
        return (
            SheetOutcome::Skipped(SheetError::WrongDimensions {
                width: expected.0,
                height: expected.1,
                actual_width: image.width(),
                actual_height: image.height(),
            }),
            None,
        );
    }

    match font.decode_sheet(original, index) {
        Ok(current) if current.samples() == image.samples() => (SheetOutcome::Unchanged, None),
        Ok(_) => match font.encode_sheet(index, image) {
            Ok(bytes) => (SheetOutcome::Rewritten, Some(bytes)),
            Err(e) => (SheetOutcome::Skipped(e), None),
        },
        Err(e) => (SheetOutcome::Skipped(e), None),
    }
}

/// Rewrite changed sheets in place
///
/// Touches only `sheet_data_off + i * sheet_size .. + sheet_size` for sheets
/// reported as [`SheetOutcome::Rewritten`].
pub(super) fn rewrite_sheets(
    buf: &mut [u8],
    original: &[u8],
    font: &Font,
    images: &[Option<SampleGrid>],
) -> Vec<SheetOutcome> {
    let count = font.tglp.sheet_count as usize;
    let planned: Vec<(SheetOutcome, Option<Vec<u8>>)> = (0..count)
        .into_par_iter()
        .map(|index| plan_sheet(original, font, index, images.get(index).and_then(Option::as_ref)))
        .collect();

    let mut outcomes = Vec::with_capacity(count);
    for (index, (outcome, bytes)) in planned.into_iter().enumerate() {
        let range = font.tglp.sheet_range(index);
        let outcome = match (outcome, bytes) {
            (SheetOutcome::Rewritten, Some(bytes)) => match buf.get_mut(range.clone()) {
                Some(slot) if slot.len() == bytes.len() => {
                    slot.copy_from_slice(&bytes);
                    info!(
                        "sheet {}: changed, re-encoded at 0x{:X} ({} bytes)",
                        index,
                        range.start,
                        bytes.len()
                    );
                    SheetOutcome::Rewritten
                }
                _ => SheetOutcome::Skipped(SheetError::Codec(gx2_tex::TexError::SizeMismatch {
                    expected: range.len(),
                    actual: bytes.len(),
                })),
            },
            (outcome, _) => outcome,
        };

        match &outcome {
            SheetOutcome::Missing => warn!("sheet {}: no edit image; keeping original", index),
            SheetOutcome::Unchanged => debug!("sheet {}: unchanged", index),
            SheetOutcome::Skipped(e) => warn!("sheet {}: keeping original: {}", index, e),
            SheetOutcome::Rewritten => {}
        }
        outcomes.push(outcome);
    }
    outcomes
}
