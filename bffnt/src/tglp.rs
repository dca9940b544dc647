//! TGLP section: glyph sheet geometry and raw sheet slices
//!
//! # Layout (after tag + size)
//!
//! ```text
//! 0x00: cell_width (u8)        0x08: base_line (u16)
//! 0x01: cell_height (u8)       0x0A: format (u16)
//! 0x02: sheet_count (u8)       0x0C: rows (u16)
//! 0x03: max_char_width (u8)    0x0E: cols (u16)
//! 0x04: sheet_size (u32)       0x10: sheet_width (u16)
//!                              0x12: sheet_height (u16)
//!                              0x14: sheet_data_off (u32, absolute)
//! ```

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::container::SectionKind;
use crate::cursor::{ByteOrder, Reader, put_u8, put_u16};
use crate::error::{FontError, Result};

const BODY: usize = 8;

/// Decoded TGLP section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tglp {
    pub offset: usize,
    pub cell_width: u8,
    pub cell_height: u8,
    pub sheet_count: u8,
    pub max_char_width: u8,
    pub sheet_size: u32,
    pub base_line: u16,
    pub format: u16,
    pub rows: u16,
    pub cols: u16,
    pub sheet_width: u16,
    pub sheet_height: u16,
    pub sheet_data_off: u32,
}

impl Tglp {
    /// Decode the TGLP section at `offset` and validate sheet bounds
    pub fn parse(buf: &[u8], offset: usize, order: ByteOrder) -> Result<Self> {
        SectionKind::Tglp.expect_at(buf, offset)?;
        let mut r = Reader::at(buf, offset + BODY, order);

        let tglp = Self {
            offset,
            cell_width: r.read_u8()?,
            cell_height: r.read_u8()?,
            sheet_count: r.read_u8()?,
            max_char_width: r.read_u8()?,
            sheet_size: r.read_u32()?,
            base_line: r.read_u16()?,
            format: r.read_u16()?,
            rows: r.read_u16()?,
            cols: r.read_u16()?,
            sheet_width: r.read_u16()?,
            sheet_height: r.read_u16()?,
            sheet_data_off: r.read_u32()?,
        };

        let data_off = tglp.sheet_data_off as usize;
        if data_off == 0 || data_off >= buf.len() {
            return Err(FontError::InvalidOffset(data_off));
        }
        for index in 0..tglp.sheet_count as usize {
            let end = tglp.sheet_range(index).end;
            if end > buf.len() {
                return Err(FontError::Truncated {
                    index,
                    end,
                    len: buf.len(),
                });
            }
        }

        Ok(tglp)
    }

    /// Glyph cells per sheet (`rows * cols`)
    pub fn cells_per_sheet(&self) -> u32 {
        self.rows as u32 * self.cols as u32
    }

    /// Byte range of sheet `index` inside the container
    pub fn sheet_range(&self, index: usize) -> Range<usize> {
        let size = self.sheet_size as usize;
        let start = self.sheet_data_off as usize + index * size;
        start..start + size
    }

    /// Raw bytes of every sheet, in order
    ///
    /// Bounds were checked by [`Tglp::parse`] against the same buffer.
    pub fn sheets<'a>(&self, buf: &'a [u8]) -> Vec<&'a [u8]> {
        (0..self.sheet_count as usize)
            .filter_map(|i| buf.get(self.sheet_range(i)))
            .collect()
    }

    /// True if the sheets can be read as BC4 block grids
    ///
    /// Both dimensions must be whole blocks and `sheet_size` must hold exactly
    /// one 8-byte block per 4x4 cell.
    pub fn has_block_geometry(&self) -> bool {
        let (w, h) = (self.sheet_width as usize, self.sheet_height as usize);
        w > 0
            && h > 0
            && w % gx2_tex::BLOCK_DIM == 0
            && h % gx2_tex::BLOCK_DIM == 0
            && (w / gx2_tex::BLOCK_DIM) * (h / gx2_tex::BLOCK_DIM) * gx2_tex::BLOCK_BYTES
                == self.sheet_size as usize
    }

    /// Snapshot in `font.json` form
    pub fn values(&self) -> TglpValues {
        TglpValues {
            cell_width: Some(self.cell_width as i64),
            cell_height: Some(self.cell_height as i64),
            sheet_count: Some(self.sheet_count as i64),
            max_char_width: Some(self.max_char_width as i64),
            sheet_size: Some(self.sheet_size as i64),
            base_line: Some(self.base_line as i64),
            format: Some(self.format as i64),
            rows: Some(self.rows as i64),
            cols: Some(self.cols as i64),
            sheet_width: Some(self.sheet_width as i64),
            sheet_height: Some(self.sheet_height as i64),
            sheet_data_off: Some(self.sheet_data_off as i64),
        }
    }

    /// Overwrite the non-structural fields present in `values`
    ///
    /// Only `cell_width`, `cell_height`, `max_char_width` and `base_line` are
    /// written (clamped). Returns how many fields were written.
    pub fn write_safe_fields(
        &self,
        buf: &mut [u8],
        values: &TglpValues,
        order: ByteOrder,
    ) -> Result<usize> {
        let body = self.offset + BODY;
        let clamp_u8 = |v: i64| v.clamp(0, u8::MAX as i64) as u8;
        let mut written = 0;

        if let Some(v) = values.cell_width {
            put_u8(buf, body, clamp_u8(v))?;
            written += 1;
        }
        if let Some(v) = values.cell_height {
            put_u8(buf, body + 1, clamp_u8(v))?;
            written += 1;
        }
        if let Some(v) = values.max_char_width {
            put_u8(buf, body + 3, clamp_u8(v))?;
            written += 1;
        }
        if let Some(v) = values.base_line {
            put_u16(buf, body + 8, v.clamp(0, u16::MAX as i64) as u16, order)?;
            written += 1;
        }
        Ok(written)
    }
}

/// TGLP fields as they appear in `font.json`
///
/// Structural fields are informational; only the four safe fields are ever
/// written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TglpValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_char_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_line: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_data_off: Option<i64>,
}
