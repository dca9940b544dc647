//! FINF section: font-wide metrics and section pointers
//!
//! Two fixed layouts exist. Legacy CTR files (`version < 0x04000000`) put the
//! height/width/ascent bytes after the pointers; every other variant puts
//! them first. Offsets below are relative to the section body (tag + size
//! skipped).
//!
//! ```text
//!  field              legacy      modern
//!  type               0  u8       0  u8
//!  height             20 u8       1  u8
//!  width              21 u8       2  u8
//!  ascent             22 u8       3  u8
//!  line_feed          1  u8       4  u16
//!  alter_char_index   2  u16      6  u16
//!  default_left       4  u8       8  u8
//!  default_glyph      5  u8       9  u8
//!  default_char       6  u8       10 u8
//!  char_encoding      7  u8       11 u8
//!  TGLP pointer       8  u32      12 u32
//!  CWDH pointer       12 u32      16 u32
//!  CMAP pointer       16 u32      20 u32
//! ```
//!
//! Pointers are stored as `absolute offset + 8`; zero means absent.

use serde::{Deserialize, Serialize};

use crate::container::{Platform, SectionKind};
use crate::cursor::{ByteOrder, get_u8, get_u16, get_u32, put_u8, put_u16, put_u32};
use crate::error::Result;

/// Tag + size
const SECTION_HEADER_LEN: usize = 8;

/// FINF layout variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinfLayout {
    Legacy,
    Modern,
}

impl FinfLayout {
    pub fn select(platform: Platform, version: u32) -> Self {
        if platform == Platform::Ctr && version < 0x0400_0000 {
            FinfLayout::Legacy
        } else {
            FinfLayout::Modern
        }
    }

    fn slot(self, field: FinfField) -> Slot {
        let (rel, width) = match (self, field) {
            (_, FinfField::Type) => (0, Width::U8),
            (FinfLayout::Legacy, FinfField::Height) => (20, Width::U8),
            (FinfLayout::Legacy, FinfField::Width) => (21, Width::U8),
            (FinfLayout::Legacy, FinfField::Ascent) => (22, Width::U8),
            (FinfLayout::Legacy, FinfField::LineFeed) => (1, Width::U8),
            (FinfLayout::Legacy, FinfField::AlterCharIndex) => (2, Width::U16),
            (FinfLayout::Legacy, FinfField::DefaultLeft) => (4, Width::U8),
            (FinfLayout::Legacy, FinfField::DefaultGlyph) => (5, Width::U8),
            (FinfLayout::Legacy, FinfField::DefaultChar) => (6, Width::U8),
            (FinfLayout::Legacy, FinfField::CharEncoding) => (7, Width::U8),
            (FinfLayout::Modern, FinfField::Height) => (1, Width::U8),
            (FinfLayout::Modern, FinfField::Width) => (2, Width::U8),
            (FinfLayout::Modern, FinfField::Ascent) => (3, Width::U8),
            (FinfLayout::Modern, FinfField::LineFeed) => (4, Width::U16),
            (FinfLayout::Modern, FinfField::AlterCharIndex) => (6, Width::U16),
            (FinfLayout::Modern, FinfField::DefaultLeft) => (8, Width::U8),
            (FinfLayout::Modern, FinfField::DefaultGlyph) => (9, Width::U8),
            (FinfLayout::Modern, FinfField::DefaultChar) => (10, Width::U8),
            (FinfLayout::Modern, FinfField::CharEncoding) => (11, Width::U8),
        };
        Slot { rel, width }
    }

    /// Relative offset of the TGLP pointer; CWDH and CMAP follow at +4 and +8
    fn pointer_base(self) -> usize {
        match self {
            FinfLayout::Legacy => 8,
            FinfLayout::Modern => 12,
        }
    }
}

/// Scalar FINF fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinfField {
    Type,
    Height,
    Width,
    Ascent,
    LineFeed,
    AlterCharIndex,
    DefaultLeft,
    DefaultGlyph,
    DefaultChar,
    CharEncoding,
}

impl FinfField {
    pub const ALL: [FinfField; 10] = [
        FinfField::Type,
        FinfField::Height,
        FinfField::Width,
        FinfField::Ascent,
        FinfField::LineFeed,
        FinfField::AlterCharIndex,
        FinfField::DefaultLeft,
        FinfField::DefaultGlyph,
        FinfField::DefaultChar,
        FinfField::CharEncoding,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FinfField::Type => "type",
            FinfField::Height => "height",
            FinfField::Width => "width",
            FinfField::Ascent => "ascent",
            FinfField::LineFeed => "line_feed",
            FinfField::AlterCharIndex => "alter_char_index",
            FinfField::DefaultLeft => "default_left",
            FinfField::DefaultGlyph => "default_glyph",
            FinfField::DefaultChar => "default_char",
            FinfField::CharEncoding => "char_encoding",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    U8,
    U16,
}

impl Width {
    fn clamp(self, value: i64) -> u16 {
        match self {
            Width::U8 => value.clamp(0, u8::MAX as i64) as u16,
            Width::U16 => value.clamp(0, u16::MAX as i64) as u16,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    rel: usize,
    width: Width,
}

/// FINF scalars as they appear in `font.json`
///
/// Every field is optional on input; only present fields are written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinfValues {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub font_type: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_feed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alter_char_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_left: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_glyph: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_char: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub char_encoding: Option<i64>,
}

impl FinfValues {
    pub fn get(&self, field: FinfField) -> Option<i64> {
        match field {
            FinfField::Type => self.font_type,
            FinfField::Height => self.height,
            FinfField::Width => self.width,
            FinfField::Ascent => self.ascent,
            FinfField::LineFeed => self.line_feed,
            FinfField::AlterCharIndex => self.alter_char_index,
            FinfField::DefaultLeft => self.default_left,
            FinfField::DefaultGlyph => self.default_glyph,
            FinfField::DefaultChar => self.default_char,
            FinfField::CharEncoding => self.char_encoding,
        }
    }

    pub fn set(&mut self, field: FinfField, value: Option<i64>) {
        let slot = match field {
            FinfField::Type => &mut self.font_type,
            FinfField::Height => &mut self.height,
            FinfField::Width => &mut self.width,
            FinfField::Ascent => &mut self.ascent,
            FinfField::LineFeed => &mut self.line_feed,
            FinfField::AlterCharIndex => &mut self.alter_char_index,
            FinfField::DefaultLeft => &mut self.default_left,
            FinfField::DefaultGlyph => &mut self.default_glyph,
            FinfField::DefaultChar => &mut self.default_char,
            FinfField::CharEncoding => &mut self.char_encoding,
        };
        *slot = value;
    }
}

/// Raw section pointers (`absolute + 8`, zero = absent)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionPointers {
    pub tglp: u32,
    pub cwdh: u32,
    pub cmap: u32,
}

/// Absolute offset a stored pointer refers to
///
/// Zero, and anything that resolves to offset 0 (the container header),
/// means "no section".
pub fn resolve_pointer(pointer: u32) -> Option<usize> {
    (pointer as usize)
        .checked_sub(SECTION_HEADER_LEN)
        .filter(|&offset| offset != 0)
}

/// Stored form of an absolute section offset
pub fn encode_pointer(offset: usize) -> u32 {
    (offset + SECTION_HEADER_LEN) as u32
}

/// Decoded FINF section and where it lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinfSection {
    pub offset: usize,
    pub layout: FinfLayout,
    pub values: FinfValues,
    pub pointers: SectionPointers,
}

impl FinfSection {
    /// Decode the FINF section at `offset`
    pub fn parse(buf: &[u8], offset: usize, layout: FinfLayout, order: ByteOrder) -> Result<Self> {
        SectionKind::Finf.expect_at(buf, offset)?;
        let body = offset + SECTION_HEADER_LEN;

        let mut values = FinfValues::default();
        for field in FinfField::ALL {
            let slot = layout.slot(field);
            let raw = match slot.width {
                Width::U8 => get_u8(buf, body + slot.rel)? as u16,
                Width::U16 => get_u16(buf, body + slot.rel, order)?,
            };
            values.set(field, Some(raw as i64));
        }

        let base = body + layout.pointer_base();
        let pointers = SectionPointers {
            tglp: get_u32(buf, base, order)?,
            cwdh: get_u32(buf, base + 4, order)?,
            cmap: get_u32(buf, base + 8, order)?,
        };

        Ok(Self {
            offset,
            layout,
            values,
            pointers,
        })
    }

    /// Absolute offset of the stored CMAP pointer
    pub fn cmap_pointer_offset(&self) -> usize {
        self.offset + SECTION_HEADER_LEN + self.layout.pointer_base() + 8
    }

    /// Overwrite one scalar in place, clamped to its storage width
    ///
    /// Touches only the 1 or 2 bytes of that field.
    pub fn write_field(
        &self,
        buf: &mut [u8],
        field: FinfField,
        value: i64,
        order: ByteOrder,
    ) -> Result<u16> {
        let slot = self.layout.slot(field);
        let at = self.offset + SECTION_HEADER_LEN + slot.rel;
        let stored = slot.width.clamp(value);
        match slot.width {
            Width::U8 => put_u8(buf, at, stored as u8)?,
            Width::U16 => put_u16(buf, at, stored, order)?,
        }
        Ok(stored)
    }

    /// Point FINF at a new CMAP head (absolute offset)
    pub fn relink_cmap(&self, buf: &mut [u8], head: usize, order: ByteOrder) -> Result<()> {
        put_u32(buf, self.cmap_pointer_offset(), encode_pointer(head), order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FontError;

    fn modern_section(order: ByteOrder) -> Vec<u8> {
        let mut buf = b"FINF".to_vec();
        buf.extend_from_slice(&order.u32_bytes(0x20));
        buf.extend_from_slice(&[1, 24, 20, 18]);
        buf.extend_from_slice(&order.u16_bytes(26));
        buf.extend_from_slice(&order.u16_bytes(7));
        buf.extend_from_slice(&[0, 2, 12, 1]);
        buf.extend_from_slice(&order.u32_bytes(0x48));
        buf.extend_from_slice(&order.u32_bytes(0x90));
        buf.extend_from_slice(&order.u32_bytes(0));
        buf
    }

    fn legacy_section() -> Vec<u8> {
        let order = ByteOrder::Little;
        let mut buf = b"FINF".to_vec();
        buf.extend_from_slice(&order.u32_bytes(0x1C));
        buf.extend_from_slice(&[1, 13]);
        buf.extend_from_slice(&order.u16_bytes(5));
        buf.extend_from_slice(&[0, 10, 11, 1]);
        buf.extend_from_slice(&order.u32_bytes(0x28));
        buf.extend_from_slice(&order.u32_bytes(0x70));
        buf.extend_from_slice(&order.u32_bytes(0x80));
        buf.extend_from_slice(&[12, 10, 9, 0]);
        buf
    }

    #[test]
    fn test_layout_selection() {
        assert_eq!(FinfLayout::select(Platform::Ctr, 0x0300_0000), FinfLayout::Legacy);
        assert_eq!(FinfLayout::select(Platform::Ctr, 0x0400_0000), FinfLayout::Modern);
        assert_eq!(FinfLayout::select(Platform::Cafe, 0x0300_0000), FinfLayout::Modern);
        assert_eq!(FinfLayout::select(Platform::Nx, 0x0401_0000), FinfLayout::Modern);
    }

    #[test]
    fn test_parse_modern() {
        let buf = modern_section(ByteOrder::Big);
        let finf = FinfSection::parse(&buf, 0, FinfLayout::Modern, ByteOrder::Big).unwrap();
        assert_eq!(finf.values.font_type, Some(1));
        assert_eq!(finf.values.height, Some(24));
        assert_eq!(finf.values.width, Some(20));
        assert_eq!(finf.values.ascent, Some(18));
        assert_eq!(finf.values.line_feed, Some(26));
        assert_eq!(finf.values.alter_char_index, Some(7));
        assert_eq!(finf.values.default_glyph, Some(2));
        assert_eq!(finf.values.char_encoding, Some(1));
        assert_eq!(
            finf.pointers,
            SectionPointers {
                tglp: 0x48,
                cwdh: 0x90,
                cmap: 0
            }
        );
        assert_eq!(finf.cmap_pointer_offset(), 28);
    }

    #[test]
    fn test_parse_legacy() {
        let buf = legacy_section();
        let finf = FinfSection::parse(&buf, 0, FinfLayout::Legacy, ByteOrder::Little).unwrap();
        assert_eq!(finf.values.line_feed, Some(13));
        assert_eq!(finf.values.alter_char_index, Some(5));
        assert_eq!(finf.values.default_glyph, Some(10));
        assert_eq!(finf.values.height, Some(12));
        assert_eq!(finf.values.width, Some(10));
        assert_eq!(finf.values.ascent, Some(9));
        assert_eq!(finf.pointers.cmap, 0x80);
        assert_eq!(finf.cmap_pointer_offset(), 24);
    }

    #[test]
    fn test_bad_tag() {
        let mut buf = modern_section(ByteOrder::Big);
        buf[0] = b'X';
        assert_eq!(
            FinfSection::parse(&buf, 0, FinfLayout::Modern, ByteOrder::Big),
            Err(FontError::BadSectionTag {
                expected: SectionKind::Finf,
                offset: 0
            })
        );
    }

    #[test]
    fn test_write_field_clamps_and_stays_in_place() {
        let order = ByteOrder::Little;
        let mut buf = modern_section(order);
        let before = buf.clone();
        let finf = FinfSection::parse(&buf, 0, FinfLayout::Modern, order).unwrap();

        assert_eq!(finf.write_field(&mut buf, FinfField::Height, 300, order).unwrap(), 255);
        assert_eq!(finf.write_field(&mut buf, FinfField::LineFeed, 70000, order).unwrap(), 0xFFFF);
        assert_eq!(finf.write_field(&mut buf, FinfField::Ascent, -5, order).unwrap(), 0);

        let diff: Vec<usize> = (0..buf.len()).filter(|&i| buf[i] != before[i]).collect();
        assert_eq!(diff, vec![9, 11, 12, 13]);

        let reparsed = FinfSection::parse(&buf, 0, FinfLayout::Modern, order).unwrap();
        assert_eq!(reparsed.values.height, Some(255));
        assert_eq!(reparsed.values.line_feed, Some(0xFFFF));
        assert_eq!(reparsed.values.ascent, Some(0));
    }

    #[test]
    fn test_relink_cmap() {
        let order = ByteOrder::Big;
        let mut buf = modern_section(order);
        let finf = FinfSection::parse(&buf, 0, FinfLayout::Modern, order).unwrap();
        finf.relink_cmap(&mut buf, 0x200, order).unwrap();
        let reparsed = FinfSection::parse(&buf, 0, FinfLayout::Modern, order).unwrap();
        assert_eq!(reparsed.pointers.cmap, 0x208);
        assert_eq!(resolve_pointer(reparsed.pointers.cmap), Some(0x200));
        assert_eq!(resolve_pointer(0), None);
    }

    #[test]
    fn test_pointer_to_header_is_absent() {
        assert_eq!(resolve_pointer(8), None);
        assert_eq!(resolve_pointer(4), None);
        assert_eq!(resolve_pointer(9), Some(1));
        assert_eq!(resolve_pointer(encode_pointer(0x34)), Some(0x34));
    }

    #[test]
    fn test_values_skip_absent_fields() {
        let values = FinfValues {
            height: Some(12),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&values).unwrap(), r#"{"height":12}"#);
        let parsed: FinfValues = serde_json::from_str(r#"{"type": 2, "line_feed": 30}"#).unwrap();
        assert_eq!(parsed.font_type, Some(2));
        assert_eq!(parsed.line_feed, Some(30));
        assert_eq!(parsed.ascent, None);
    }
}
