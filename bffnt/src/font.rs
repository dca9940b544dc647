//! Decoded view of a whole container

use std::collections::BTreeMap;

use gx2_tex::SwizzleSeed;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cmap::CmapChain;
use crate::container::{Header, SectionKind, find_section};
use crate::cwdh::{CwdhChain, GlyphWidth};
use crate::error::{Result, SheetError};
use crate::finf::{FinfLayout, FinfSection, resolve_pointer};
use crate::projection::{GlyphEntry, build_glyphs};
use crate::sheet_image::SampleGrid;
use crate::tglp::Tglp;

/// Every section of a container, decoded from one immutable byte snapshot
///
/// Holds offsets and decoded values only; the bytes stay with the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub header: Header,
    pub finf: FinfSection,
    pub tglp: Tglp,
    pub cwdh: CwdhChain,
    pub cmap: CmapChain,
    /// Width per glyph index
    pub widths: BTreeMap<u32, GlyphWidth>,
    /// Glyph index per codepoint
    pub mapping: BTreeMap<u32, u16>,
}

impl Font {
    /// Decode header, FINF, TGLP and both chains
    ///
    /// FINF is located by tag. The other sections follow FINF's pointers,
    /// falling back to a tag search when a pointer is zero.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let header = Header::parse(buf)?;
        let order = header.byte_order;

        let finf_off = find_section(buf, SectionKind::Finf)?;
        let layout = FinfLayout::select(header.platform, header.version);
        let finf = FinfSection::parse(buf, finf_off, layout, order)?;

        let locate = |pointer: u32, kind: SectionKind| match resolve_pointer(pointer) {
            Some(offset) => Ok(offset),
            None => find_section(buf, kind),
        };
        let tglp_off = locate(finf.pointers.tglp, SectionKind::Tglp)?;
        let cwdh_off = locate(finf.pointers.cwdh, SectionKind::Cwdh)?;
        let cmap_off = locate(finf.pointers.cmap, SectionKind::Cmap)?;

        let tglp = Tglp::parse(buf, tglp_off, order)?;
        let cwdh = CwdhChain::walk(buf, cwdh_off, order)?;
        let cmap = CmapChain::walk(buf, cmap_off, order, header.platform.wide_codes())?;
        let widths = cwdh.widths(buf);
        let mapping = cmap.resolve(buf)?;

        info!(
            "{} {:?} {}: FINF @ 0x{:X}, TGLP @ 0x{:X}, CWDH @ 0x{:X}, CMAP @ 0x{:X}",
            header.signature,
            header.platform,
            if header.little_endian() { "LE" } else { "BE" },
            finf_off,
            tglp_off,
            cwdh_off,
            cmap_off
        );
        debug!(
            "{} width entries, {} CMAP pairs, {} sheets of {} bytes",
            widths.len(),
            mapping.len(),
            tglp.sheet_count,
            tglp.sheet_size
        );

        Ok(Self {
            header,
            finf,
            tglp,
            cwdh,
            cmap,
            widths,
            mapping,
        })
    }

    /// Editable glyph list, sorted by glyph index
    pub fn glyphs(&self) -> Vec<GlyphEntry> {
        build_glyphs(&self.mapping, &self.widths, &self.tglp)
    }

    fn check_geometry(&self) -> std::result::Result<(), SheetError> {
        if self.tglp.has_block_geometry() {
            Ok(())
        } else {
            Err(SheetError::Unsupported {
                format: self.tglp.format,
                width: self.tglp.sheet_width,
                height: self.tglp.sheet_height,
                size: self.tglp.sheet_size,
            })
        }
    }

    /// Decode sheet `index` of `buf` into samples
    pub fn decode_sheet(&self, buf: &[u8], index: usize) -> std::result::Result<SampleGrid, SheetError> {
        self.check_geometry()?;
        let (w, h) = (self.tglp.sheet_width, self.tglp.sheet_height);
        let range = self.tglp.sheet_range(index);
        let data = buf.get(range.clone()).ok_or(gx2_tex::TexError::SizeMismatch {
            expected: range.len(),
            actual: buf.len().saturating_sub(range.start),
        })?;
        let samples = gx2_tex::decode_sheet(data, w as usize, h as usize, SwizzleSeed::for_sheet(index))?;
        let actual = samples.len();
        SampleGrid::new(w as u32, h as u32, samples).ok_or(SheetError::Codec(
            gx2_tex::TexError::SizeMismatch {
                expected: w as usize * h as usize,
                actual,
            },
        ))
    }

    /// Encode samples for sheet `index`; the result is exactly `sheet_size` bytes
    pub fn encode_sheet(&self, index: usize, grid: &SampleGrid) -> std::result::Result<Vec<u8>, SheetError> {
        self.check_geometry()?;
        let (w, h) = (self.tglp.sheet_width as u32, self.tglp.sheet_height as u32);
        if grid.dimensions() != (w, h) {
            return Err(SheetError::WrongDimensions {
                width: w,
                height: h,
                actual_width: grid.width(),
                actual_height: grid.height(),
            });
        }
        Ok(gx2_tex::encode_sheet(
            grid.samples(),
            w as usize,
            h as usize,
            SwizzleSeed::for_sheet(index),
        )?)
    }

    /// Decode every sheet in parallel; undecodable sheets are `None`
    pub fn decode_sheets(&self, buf: &[u8]) -> Vec<Option<SampleGrid>> {
        (0..self.tglp.sheet_count as usize)
            .into_par_iter()
            .map(|index| match self.decode_sheet(buf, index) {
                Ok(grid) => Some(grid),
                Err(e) => {
                    warn!("sheet {}: not decoded: {}", index, e);
                    None
                }
            })
            .collect()
    }
}
