//! CWDH chain: per-glyph width triples
//!
//! Segment layout:
//!
//! ```text
//! 0x00: "CWDH"
//! 0x04: section size (u32)
//! 0x08: start index (u16)
//! 0x0A: end index (u16, inclusive)
//! 0x0C: next segment pointer (u32, absolute + 8, 0 = end)
//! 0x10: (end - start + 1) x { left: i8, glyph: u8, char: u8 }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::ops::Range;

use tracing::warn;

use crate::container::SectionKind;
use crate::cursor::{ByteOrder, Reader, put_u8};
use crate::error::{FontError, Result};
use crate::finf::resolve_pointer;

const ENTRIES: usize = 16;
const ENTRY_LEN: usize = 3;

/// Width metrics of one glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphWidth {
    pub left: i8,
    pub glyph: u8,
    pub char_width: u8,
}

impl GlyphWidth {
    /// Build from unclamped values (`left` to [-128, 127], the rest to [0, 255])
    pub fn clamped(left: i64, glyph: i64, char_width: i64) -> Self {
        Self {
            left: left.clamp(i8::MIN as i64, i8::MAX as i64) as i8,
            glyph: glyph.clamp(0, u8::MAX as i64) as u8,
            char_width: char_width.clamp(0, u8::MAX as i64) as u8,
        }
    }
}

/// One CWDH segment descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CwdhSegment {
    pub offset: usize,
    pub start_index: u16,
    pub end_index: u16,
    pub next: u32,
}

impl CwdhSegment {
    /// Number of triples carried (zero if `end < start`)
    pub fn len(&self) -> usize {
        if self.end_index < self.start_index {
            0
        } else {
            (self.end_index - self.start_index) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Absolute offset of the triple for glyph `index`, if this segment covers it
    pub fn entry_offset(&self, index: u32) -> Option<usize> {
        let start = self.start_index as u32;
        if index < start || (index - start) as usize >= self.len() {
            return None;
        }
        Some(self.offset + ENTRIES + (index - start) as usize * ENTRY_LEN)
    }

    fn indices(&self) -> Range<u32> {
        let start = self.start_index as u32;
        start..start + self.len() as u32
    }
}

/// CWDH segments in chain order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CwdhChain {
    pub segments: Vec<CwdhSegment>,
}

impl CwdhChain {
    /// Walk the chain from `head`
    ///
    /// Stops at a zero pointer or at a segment already visited. Every
    /// segment's triples must lie inside the buffer.
    pub fn walk(buf: &[u8], head: usize, order: ByteOrder) -> Result<Self> {
        let mut segments = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(head);

        while let Some(offset) = next {
            if !visited.insert(offset) {
                warn!("CWDH chain loops back to 0x{:X}; stopping", offset);
                break;
            }
            SectionKind::Cwdh.expect_at(buf, offset)?;
            let mut r = Reader::at(buf, offset + 8, order);
            let segment = CwdhSegment {
                offset,
                start_index: r.read_u16()?,
                end_index: r.read_u16()?,
                next: r.read_u32()?,
            };

            let end = offset + ENTRIES + segment.len() * ENTRY_LEN;
            if end > buf.len() {
                return Err(FontError::OutOfBounds {
                    offset: offset + ENTRIES,
                    size: segment.len() * ENTRY_LEN,
                });
            }

            next = resolve_pointer(segment.next);
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    /// Width per glyph index; a later segment overwrites an earlier one
    pub fn widths(&self, buf: &[u8]) -> BTreeMap<u32, GlyphWidth> {
        let mut widths = BTreeMap::new();
        for segment in &self.segments {
            for index in segment.indices() {
                let Some(at) = segment.entry_offset(index) else {
                    continue;
                };
                if let Some(&[left, glyph, char_width]) = buf.get(at..at + ENTRY_LEN) {
                    widths.insert(
                        index,
                        GlyphWidth {
                            left: left as i8,
                            glyph,
                            char_width,
                        },
                    );
                }
            }
        }
        widths
    }

    /// Overwrite the triple of every edited glyph index in place
    ///
    /// Touches only the 3-byte entries of indices present in `edits`. Returns
    /// the number of triples written.
    pub fn patch(&self, buf: &mut [u8], edits: &BTreeMap<u32, GlyphWidth>) -> Result<usize> {
        let mut written = 0;
        for segment in &self.segments {
            for index in segment.indices() {
                let (Some(width), Some(at)) = (edits.get(&index), segment.entry_offset(index))
                else {
                    continue;
                };
                put_u8(buf, at, width.left as u8)?;
                put_u8(buf, at + 1, width.glyph)?;
                put_u8(buf, at + 2, width.char_width)?;
                written += 1;
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(order: ByteOrder, start: u16, entries: &[(i8, u8, u8)], next: u32) -> Vec<u8> {
        let mut buf = b"CWDH".to_vec();
        buf.extend_from_slice(&order.u32_bytes((16 + entries.len() * 3) as u32));
        buf.extend_from_slice(&order.u16_bytes(start));
        buf.extend_from_slice(&order.u16_bytes(start + entries.len() as u16 - 1));
        buf.extend_from_slice(&order.u32_bytes(next));
        for &(l, g, c) in entries {
            buf.extend_from_slice(&[l as u8, g, c]);
        }
        buf
    }

    #[test]
    fn test_two_segment_chain() {
        let order = ByteOrder::Little;
        let mut buf = segment(order, 0, &[(0, 5, 6), (-1, 7, 8)], 0);
        let second = buf.len();
        buf[12..16].copy_from_slice(&order.u32_bytes(second as u32 + 8));
        buf.extend(segment(order, 10, &[(2, 3, 4)], 0));

        let chain = CwdhChain::walk(&buf, 0, order).unwrap();
        assert_eq!(chain.segments.len(), 2);
        let widths = chain.widths(&buf);
        assert_eq!(widths.len(), 3);
        assert_eq!(
            widths[&1],
            GlyphWidth {
                left: -1,
                glyph: 7,
                char_width: 8
            }
        );
        assert_eq!(widths[&10].glyph, 3);
        assert!(!widths.contains_key(&2));
    }

    #[test]
    fn test_cycle_stops() {
        let order = ByteOrder::Big;
        let mut buf = segment(order, 0, &[(1, 2, 3)], 0);
        let second = buf.len();
        buf[12..16].copy_from_slice(&order.u32_bytes(second as u32 + 8));
        // Second segment points back at itself
        buf.extend(segment(order, 5, &[(4, 5, 6)], second as u32 + 8));

        let chain = CwdhChain::walk(&buf, 0, order).unwrap();
        assert_eq!(chain.segments.len(), 2);
        assert_eq!(chain.widths(&buf).len(), 2);
    }

    #[test]
    fn test_pointer_to_offset_zero_ends_chain() {
        let order = ByteOrder::Big;
        let buf = segment(order, 0, &[(1, 2, 3)], 8);
        let chain = CwdhChain::walk(&buf, 0, order).unwrap();
        assert_eq!(chain.segments.len(), 1);
    }

    #[test]
    fn test_bad_tag() {
        let mut buf = segment(ByteOrder::Big, 0, &[(1, 2, 3)], 0);
        buf[0] = b'Z';
        assert!(matches!(
            CwdhChain::walk(&buf, 0, ByteOrder::Big),
            Err(FontError::BadSectionTag { .. })
        ));
    }

    #[test]
    fn test_truncated_entries() {
        let mut buf = segment(ByteOrder::Big, 0, &[(1, 2, 3), (4, 5, 6)], 0);
        buf.truncate(buf.len() - 1);
        assert!(matches!(
            CwdhChain::walk(&buf, 0, ByteOrder::Big),
            Err(FontError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_patch_only_edited_triples() {
        let order = ByteOrder::Big;
        let mut buf = segment(order, 100, &[(0, 1, 2), (3, 4, 5), (6, 7, 8)], 0);
        let before = buf.clone();
        let chain = CwdhChain::walk(&buf, 0, order).unwrap();

        let mut edits = BTreeMap::new();
        edits.insert(101, GlyphWidth::clamped(-300, 10, 999));
        edits.insert(500, GlyphWidth::clamped(1, 1, 1));
        assert_eq!(chain.patch(&mut buf, &edits).unwrap(), 1);

        let widths = chain.widths(&buf);
        assert_eq!(
            widths[&101],
            GlyphWidth {
                left: -128,
                glyph: 10,
                char_width: 255
            }
        );
        assert_eq!(widths[&100], GlyphWidth { left: 0, glyph: 1, char_width: 2 });
        let diff: Vec<usize> = (0..buf.len()).filter(|&i| buf[i] != before[i]).collect();
        assert_eq!(diff, vec![19, 20, 21]);
    }

    #[test]
    fn test_reversed_range_is_empty() {
        let seg = CwdhSegment {
            offset: 0,
            start_index: 5,
            end_index: 4,
            next: 0,
        };
        assert!(seg.is_empty());
        assert_eq!(seg.entry_offset(5), None);
    }
}
