//! CMAP chain: codepoint to glyph index mapping
//!
//! # Segment Layout
//!
//! ```text
//! 0x00: "CMAP"
//! 0x04: section size (u32)
//! 0x08: code_begin, code_end (u32 each on NX, u16 each elsewhere)
//!  +0 : mapping method (u16: 0 = Direct, 1 = Table, 2 = Scan)
//!  +2 : reserved (u16)
//!  +4 : next segment pointer (u32, absolute + 8, 0 = end)
//!  +8 : method body
//! ```
//!
//! Method bodies:
//!
//! - **Direct**: `char_offset: u16`; `index = code - code_begin + char_offset`
//! - **Table**: one `i16` per code in `code_begin..=code_end`
//! - **Scan**: `count: u16` (+2 padding on NX), then `count` pairs of
//!   `code` (u32 on NX, else u16) and `index: i16` (+2 padding on NX)
//!
//! Index `-1` (`0xFFFF`) means "no glyph". When segments overlap, the one
//! closest to the head of the chain wins.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::RangeInclusive;

use tracing::{debug, warn};

use crate::container::SectionKind;
use crate::cursor::{ByteOrder, Reader, get_i16, get_u16, put_i16, put_u16};
use crate::error::{FontError, Result};
use crate::finf::resolve_pointer;

/// Glyph index meaning "unmapped"
pub const NO_GLYPH: u16 = 0xFFFF;

/// Codepoint that never takes part in a mapping
pub const RESERVED_CODE: u32 = 0xFFFF;

/// How a segment maps its code range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMethod {
    Direct,
    Table,
    Scan,
}

impl MappingMethod {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(MappingMethod::Direct),
            1 => Some(MappingMethod::Table),
            2 => Some(MappingMethod::Scan),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            MappingMethod::Direct => 0,
            MappingMethod::Table => 1,
            MappingMethod::Scan => 2,
        }
    }
}

/// One CMAP segment descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmapSegment {
    pub offset: usize,
    pub code_begin: u32,
    pub code_end: u32,
    pub method: MappingMethod,
    pub next: u32,
    /// Absolute offset of the method body
    pub body: usize,
}

impl CmapSegment {
    pub fn codes(&self) -> RangeInclusive<u32> {
        self.code_begin..=self.code_end
    }

    fn table_slot(&self, code: u32) -> usize {
        self.body + (code - self.code_begin) as usize * 2
    }
}

/// Explicit pair inside a Scan segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScanPair {
    code: u32,
    index: u16,
    /// Absolute offset of the `i16` index field
    index_at: usize,
}

/// Counters from an in-place CMAP patch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmapPatchStats {
    /// Table slots, Scan pairs and Direct codes rewritten
    pub pairs_updated: usize,
    /// Offsets of Direct segments whose edits could not be expressed
    pub direct_skipped: Vec<usize>,
}

/// CMAP segments in chain order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmapChain {
    pub segments: Vec<CmapSegment>,
    /// Codes are u32 (NX) rather than u16
    pub wide_codes: bool,
    pub order: ByteOrder,
}

impl CmapChain {
    /// Walk the chain from `head`
    ///
    /// Stops at a zero pointer or an already visited segment. An unknown
    /// mapping method is fatal.
    pub fn walk(buf: &[u8], head: usize, order: ByteOrder, wide_codes: bool) -> Result<Self> {
        let mut segments = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(head);

        while let Some(offset) = next {
            if !visited.insert(offset) {
                warn!("CMAP chain loops back to 0x{:X}; stopping", offset);
                break;
            }
            SectionKind::Cmap.expect_at(buf, offset)?;
            let mut r = Reader::at(buf, offset + 8, order);
            let (code_begin, code_end) = if wide_codes {
                (r.read_u32()?, r.read_u32()?)
            } else {
                (r.read_u16()? as u32, r.read_u16()? as u32)
            };
            let raw_method = r.read_u16()?;
            let method = MappingMethod::from_u16(raw_method).ok_or(
                FontError::UnknownMappingMethod {
                    method: raw_method,
                    offset,
                },
            )?;
            r.skip(2);
            let pointer = r.read_u32()?;

            segments.push(CmapSegment {
                offset,
                code_begin,
                code_end,
                method,
                next: pointer,
                body: r.position(),
            });
            next = resolve_pointer(pointer);
        }

        Ok(Self {
            segments,
            wide_codes,
            order,
        })
    }

    fn scan_pairs(&self, buf: &[u8], segment: &CmapSegment) -> Result<Vec<ScanPair>> {
        let mut r = Reader::at(buf, segment.body, self.order);
        let count = r.read_u16()?;
        if self.wide_codes {
            r.skip(2);
        }

        let mut pairs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let code = if self.wide_codes {
                r.read_u32()?
            } else {
                r.read_u16()? as u32
            };
            let index_at = r.position();
            let index = r.read_u16()?;
            if self.wide_codes {
                r.skip(2);
            }
            pairs.push(ScanPair {
                code,
                index,
                index_at,
            });
        }
        Ok(pairs)
    }

    /// Codepoint to glyph index map; the first segment to map a code wins
    pub fn resolve(&self, buf: &[u8]) -> Result<BTreeMap<u32, u16>> {
        let mut map = BTreeMap::new();
        for segment in &self.segments {
            match segment.method {
                MappingMethod::Direct => {
                    let char_offset = get_u16(buf, segment.body, self.order)? as u64;
                    for code in segment.codes() {
                        let index = (code - segment.code_begin) as u64 + char_offset;
                        if index < NO_GLYPH as u64 {
                            map.entry(code).or_insert(index as u16);
                        }
                    }
                }
                MappingMethod::Table => {
                    for code in segment.codes() {
                        let index = get_i16(buf, segment.table_slot(code), self.order)? as u16;
                        if index != NO_GLYPH {
                            map.entry(code).or_insert(index);
                        }
                    }
                }
                MappingMethod::Scan => {
                    for pair in self.scan_pairs(buf, segment)? {
                        if pair.index != NO_GLYPH {
                            map.entry(pair.code).or_insert(pair.index);
                        }
                    }
                }
            }
        }
        Ok(map)
    }

    /// Rewrite existing segments in place so they resolve to `desired`
    ///
    /// Only codes whose current mapping differs from `desired` are touched,
    /// and only in the segment that actually resolves them:
    ///
    /// - Table slots get the desired index, or `-1` when the code is dropped
    /// - Scan pairs already listing the code get the desired index
    /// - Direct segments get a new `char_offset` when every code they resolve
    ///   maps linearly; otherwise they are skipped with a warning
    ///
    /// Touches only Table slots, Scan index fields and Direct offsets. Pairs
    /// this cannot express are left for [`build_override_segment`].
    pub fn patch_in_place(
        &self,
        buf: &mut [u8],
        desired: &BTreeMap<u32, u16>,
    ) -> Result<CmapPatchStats> {
        let current = mappable(&self.resolve(buf)?);
        let dirty = dirty_codes(&current, desired);
        let mut stats = CmapPatchStats::default();
        if dirty.is_empty() {
            return Ok(stats);
        }

        // Codes already resolved by segments nearer the head
        let mut claimed: HashSet<u32> = HashSet::new();

        for segment in &self.segments {
            match segment.method {
                MappingMethod::Table => {
                    for code in segment.codes() {
                        if claimed.contains(&code) {
                            continue;
                        }
                        let slot = segment.table_slot(code);
                        let mut index = get_i16(buf, slot, self.order)? as u16;
                        if dirty.contains(&code) {
                            let wanted = desired.get(&code).copied().unwrap_or(NO_GLYPH);
                            if wanted != index {
                                put_i16(buf, slot, wanted as i16, self.order)?;
                                stats.pairs_updated += 1;
                                index = wanted;
                            }
                        }
                        if index != NO_GLYPH {
                            claimed.insert(code);
                        }
                    }
                }
                MappingMethod::Scan => {
                    for pair in self.scan_pairs(buf, segment)? {
                        if claimed.contains(&pair.code) {
                            continue;
                        }
                        let mut index = pair.index;
                        let wanted = desired
                            .get(&pair.code)
                            .copied()
                            .filter(|&wanted| wanted != index && dirty.contains(&pair.code));
                        if let Some(wanted) = wanted {
                            put_i16(buf, pair.index_at, wanted as i16, self.order)?;
                            stats.pairs_updated += 1;
                            index = wanted;
                        }
                        if index != NO_GLYPH {
                            claimed.insert(pair.code);
                        }
                    }
                }
                MappingMethod::Direct => {
                    let mut char_offset = get_u16(buf, segment.body, self.order)? as i64;
                    let open: Vec<u32> = segment
                        .codes()
                        .filter(|code| *code != RESERVED_CODE && !claimed.contains(code))
                        .collect();

                    if open.iter().any(|code| dirty.contains(code)) {
                        match linear_offset(segment, &open, desired) {
                            Some(new_offset) => {
                                if new_offset != char_offset {
                                    put_u16(buf, segment.body, new_offset as u16, self.order)?;
                                }
                                debug!(
                                    "CMAP Direct 0x{:X}: char_offset {} -> {}",
                                    segment.offset, char_offset, new_offset
                                );
                                stats.pairs_updated += open.len();
                                char_offset = new_offset;
                            }
                            None => {
                                warn!(
                                    "CMAP Direct segment at 0x{:X} cannot express the edited mapping; leaving it untouched",
                                    segment.offset
                                );
                                stats.direct_skipped.push(segment.offset);
                            }
                        }
                    }

                    for code in open {
                        if (code - segment.code_begin) as i64 + char_offset < NO_GLYPH as i64 {
                            claimed.insert(code);
                        }
                    }
                }
            }
        }

        Ok(stats)
    }

    /// Desired pairs the chain still resolves differently
    pub fn residual(&self, buf: &[u8], desired: &BTreeMap<u32, u16>) -> Result<BTreeSet<u32>> {
        Ok(dirty_codes(&mappable(&self.resolve(buf)?), desired))
    }
}

/// The single `char_offset` that maps every open code to its desired index
fn linear_offset(segment: &CmapSegment, open: &[u32], desired: &BTreeMap<u32, u16>) -> Option<i64> {
    let mut offset = None;
    for &code in open {
        let index = *desired.get(&code)? as i64;
        let candidate = index - (code - segment.code_begin) as i64;
        match offset {
            None => offset = Some(candidate),
            Some(existing) if existing != candidate => return None,
            Some(_) => {}
        }
    }
    offset.filter(|o| (0..=u16::MAX as i64).contains(o))
}

/// Drop entries that never take part in a mapping
pub fn mappable(map: &BTreeMap<u32, u16>) -> BTreeMap<u32, u16> {
    map.iter()
        .filter(|&(&code, _)| code != RESERVED_CODE)
        .map(|(&code, &index)| (code, index))
        .collect()
}

/// Codes whose mapping differs between two maps
fn dirty_codes(current: &BTreeMap<u32, u16>, desired: &BTreeMap<u32, u16>) -> BTreeSet<u32> {
    current
        .keys()
        .chain(desired.keys())
        .filter(|code| current.get(code) != desired.get(code))
        .copied()
        .collect()
}

/// Build a standalone Scan segment listing every pair of `pairs`
///
/// The segment has `code_begin = code_end = 0` and `next = 0`, so once it is
/// the chain head it replaces the whole chain. Fails with `TooManyPairs`
/// when the pair count does not fit the u16 count field.
pub fn build_override_segment(
    pairs: &BTreeMap<u32, u16>,
    order: ByteOrder,
    wide_codes: bool,
) -> Result<Vec<u8>> {
    let count = pairs.len();
    let stored_count = u16::try_from(count).map_err(|_| FontError::TooManyPairs { count })?;
    let (header_len, prefix_len, pair_len) = if wide_codes { (24, 4, 8) } else { (20, 2, 4) };
    let size = header_len + prefix_len + count * pair_len;

    let mut seg = Vec::with_capacity(size);
    seg.extend_from_slice(SectionKind::Cmap.tag());
    seg.extend_from_slice(&order.u32_bytes(size as u32));
    if wide_codes {
        seg.extend_from_slice(&order.u32_bytes(0));
        seg.extend_from_slice(&order.u32_bytes(0));
    } else {
        seg.extend_from_slice(&order.u16_bytes(0));
        seg.extend_from_slice(&order.u16_bytes(0));
    }
    seg.extend_from_slice(&order.u16_bytes(MappingMethod::Scan.as_u16()));
    seg.extend_from_slice(&[0, 0]);
    seg.extend_from_slice(&order.u32_bytes(0));

    seg.extend_from_slice(&order.u16_bytes(stored_count));
    if wide_codes {
        seg.extend_from_slice(&[0, 0]);
    }
    for (&code, &index) in pairs {
        if wide_codes {
            seg.extend_from_slice(&order.u32_bytes(code));
        } else {
            seg.extend_from_slice(&order.u16_bytes(code as u16));
        }
        seg.extend_from_slice(&order.u16_bytes(index));
        if wide_codes {
            seg.extend_from_slice(&[0, 0]);
        }
    }
    Ok(seg)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal segment builder: header + raw body
    fn segment(order: ByteOrder, wide: bool, range: (u32, u32), method: u16, next: u32, body: &[u8]) -> Vec<u8> {
        let mut buf = b"CMAP".to_vec();
        let header = if wide { 24 } else { 20 };
        buf.extend_from_slice(&order.u32_bytes((header + body.len()) as u32));
        if wide {
            buf.extend_from_slice(&order.u32_bytes(range.0));
            buf.extend_from_slice(&order.u32_bytes(range.1));
        } else {
            buf.extend_from_slice(&order.u16_bytes(range.0 as u16));
            buf.extend_from_slice(&order.u16_bytes(range.1 as u16));
        }
        buf.extend_from_slice(&order.u16_bytes(method));
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&order.u32_bytes(next));
        buf.extend_from_slice(body);
        buf
    }

    fn table_body(order: ByteOrder, indices: &[i16]) -> Vec<u8> {
        indices.iter().flat_map(|&i| order.u16_bytes(i as u16)).collect()
    }

    fn scan_body(order: ByteOrder, pairs: &[(u16, i16)]) -> Vec<u8> {
        let mut body = order.u16_bytes(pairs.len() as u16).to_vec();
        for &(code, index) in pairs {
            body.extend_from_slice(&order.u16_bytes(code));
            body.extend_from_slice(&order.u16_bytes(index as u16));
        }
        body
    }

    /// Concatenate segments, linking each to the next
    fn linked(order: ByteOrder, wide: bool, parts: Vec<((u32, u32), u16, Vec<u8>)>) -> Vec<u8> {
        let mut buf = Vec::new();
        let count = parts.len();
        for (i, (range, method, body)) in parts.into_iter().enumerate() {
            let header = if wide { 24 } else { 20 };
            let next = if i + 1 < count {
                (buf.len() + header + body.len() + 8) as u32
            } else {
                0
            };
            buf.extend(segment(order, wide, range, method, next, &body));
        }
        buf
    }

    #[test]
    fn test_direct_resolution() {
        let order = ByteOrder::Big;
        let buf = segment(order, false, (0x20, 0x7E), 0, 0, &order.u16_bytes(1));
        let chain = CmapChain::walk(&buf, 0, order, false).unwrap();
        let map = chain.resolve(&buf).unwrap();
        assert_eq!(map.len(), 0x5F);
        assert_eq!(map[&0x20], 1);
        assert_eq!(map[&0x41], 0x41 - 0x20 + 1);
    }

    #[test]
    fn test_direct_discards_overflow() {
        let order = ByteOrder::Little;
        let buf = segment(order, false, (0, 3), 0, 0, &order.u16_bytes(0xFFFD));
        let chain = CmapChain::walk(&buf, 0, order, false).unwrap();
        let map = chain.resolve(&buf).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&1], 0xFFFE);
    }

    #[test]
    fn test_table_discards_minus_one() {
        let order = ByteOrder::Big;
        let body = table_body(order, &[5, -1, 7]);
        let buf = segment(order, false, (0x100, 0x102), 1, 0, &body);
        let map = CmapChain::walk(&buf, 0, order, false).unwrap().resolve(&buf).unwrap();
        assert_eq!(map.into_iter().collect::<Vec<_>>(), vec![(0x100, 5), (0x102, 7)]);
    }

    #[test]
    fn test_scan_resolution() {
        let order = ByteOrder::Little;
        let body = scan_body(order, &[(0x0490, 140), (0x0491, -1)]);
        let buf = segment(order, false, (0x0490, 0x0491), 2, 0, &body);
        let map = CmapChain::walk(&buf, 0, order, false).unwrap().resolve(&buf).unwrap();
        assert_eq!(map.get(&0x0490), Some(&140));
        assert_eq!(map.get(&0x0491), None);
    }

    #[test]
    fn test_wide_scan_resolution() {
        let order = ByteOrder::Little;
        let mut body = order.u16_bytes(2).to_vec();
        body.extend_from_slice(&[0, 0]);
        for (code, index) in [(0x1F600u32, 9u16), (0x41, 3)] {
            body.extend_from_slice(&order.u32_bytes(code));
            body.extend_from_slice(&order.u16_bytes(index));
            body.extend_from_slice(&[0, 0]);
        }
        let buf = segment(order, true, (0, 0x1F600), 2, 0, &body);
        let map = CmapChain::walk(&buf, 0, order, true).unwrap().resolve(&buf).unwrap();
        assert_eq!(map[&0x1F600], 9);
        assert_eq!(map[&0x41], 3);
    }

    #[test]
    fn test_head_segment_wins() {
        let order = ByteOrder::Big;
        let buf = linked(
            order,
            false,
            vec![
                ((0x41, 0x41), 2, scan_body(order, &[(0x41, 99)])),
                ((0x41, 0x43), 0, order.u16_bytes(10).to_vec()),
            ],
        );
        let map = CmapChain::walk(&buf, 0, order, false).unwrap().resolve(&buf).unwrap();
        assert_eq!(map[&0x41], 99);
        assert_eq!(map[&0x42], 11);
        assert_eq!(map[&0x43], 12);
    }

    #[test]
    fn test_unknown_method() {
        let order = ByteOrder::Big;
        let buf = segment(order, false, (0, 1), 3, 0, &[0, 0]);
        assert_eq!(
            CmapChain::walk(&buf, 0, order, false),
            Err(FontError::UnknownMappingMethod { method: 3, offset: 0 })
        );
    }

    #[test]
    fn test_cycle_stops() {
        let order = ByteOrder::Big;
        // 22-byte segments; the second one points back at itself
        let mut buf = segment(order, false, (0x41, 0x41), 0, 30, &order.u16_bytes(0));
        buf.extend(segment(order, false, (0x42, 0x42), 0, 30, &order.u16_bytes(5)));
        let chain = CmapChain::walk(&buf, 0, order, false).unwrap();
        assert_eq!(chain.segments.len(), 2);
        assert_eq!(chain.resolve(&buf).unwrap()[&0x42], 5);
    }

    #[test]
    fn test_pointer_to_offset_zero_ends_chain() {
        let order = ByteOrder::Big;
        let buf = segment(order, false, (0x41, 0x41), 0, 8, &order.u16_bytes(0));
        let chain = CmapChain::walk(&buf, 0, order, false).unwrap();
        assert_eq!(chain.segments.len(), 1);
    }

    #[test]
    fn test_patch_noop_writes_nothing() {
        let order = ByteOrder::Big;
        let mut buf = linked(
            order,
            false,
            vec![
                ((0x30, 0x32), 1, table_body(order, &[1, -1, 3])),
                ((0x20, 0x2F), 0, order.u16_bytes(4).to_vec()),
            ],
        );
        let before = buf.clone();
        let chain = CmapChain::walk(&buf, 0, order, false).unwrap();
        let desired = chain.resolve(&buf).unwrap();
        let stats = chain.patch_in_place(&mut buf, &desired).unwrap();
        assert_eq!(stats, CmapPatchStats::default());
        assert_eq!(buf, before);
    }

    #[test]
    fn test_patch_table_and_scan() {
        let order = ByteOrder::Little;
        let mut buf = linked(
            order,
            false,
            vec![
                ((0x30, 0x32), 1, table_body(order, &[1, 2, 3])),
                ((0x40, 0x41), 2, scan_body(order, &[(0x40, 10), (0x41, 11)])),
            ],
        );
        let chain = CmapChain::walk(&buf, 0, order, false).unwrap();
        let mut desired = chain.resolve(&buf).unwrap();
        desired.remove(&0x31);
        desired.insert(0x32, 30);
        desired.insert(0x41, 40);

        let stats = chain.patch_in_place(&mut buf, &desired).unwrap();
        assert_eq!(stats.pairs_updated, 3);
        assert_eq!(chain.resolve(&buf).unwrap(), desired);
        assert!(chain.residual(&buf, &desired).unwrap().is_empty());
    }

    #[test]
    fn test_patch_scan_cannot_insert() {
        let order = ByteOrder::Big;
        let mut buf = segment(order, false, (0x40, 0x40), 2, 0, &scan_body(order, &[(0x40, 10)]));
        let chain = CmapChain::walk(&buf, 0, order, false).unwrap();
        let mut desired = chain.resolve(&buf).unwrap();
        desired.insert(0x50, 20);

        let stats = chain.patch_in_place(&mut buf, &desired).unwrap();
        assert_eq!(stats.pairs_updated, 0);
        assert_eq!(
            chain.residual(&buf, &desired).unwrap().into_iter().collect::<Vec<_>>(),
            vec![0x50]
        );
    }

    #[test]
    fn test_patch_direct_linear_shift() {
        let order = ByteOrder::Big;
        let mut buf = segment(order, false, (0x41, 0x44), 0, 0, &order.u16_bytes(0));
        let chain = CmapChain::walk(&buf, 0, order, false).unwrap();
        let desired: BTreeMap<u32, u16> = (0x41..=0x44).map(|c| (c, (c - 0x41 + 7) as u16)).collect();

        let stats = chain.patch_in_place(&mut buf, &desired).unwrap();
        assert_eq!(stats.pairs_updated, 4);
        assert!(stats.direct_skipped.is_empty());
        assert_eq!(get_u16(&buf, chain.segments[0].body, order).unwrap(), 7);
        assert_eq!(chain.resolve(&buf).unwrap(), desired);
    }

    #[test]
    fn test_patch_direct_nonlinear_is_skipped() {
        let order = ByteOrder::Big;
        let mut buf = segment(order, false, (0x41, 0x43), 0, 0, &order.u16_bytes(0));
        let before = buf.clone();
        let chain = CmapChain::walk(&buf, 0, order, false).unwrap();
        let mut desired = chain.resolve(&buf).unwrap();
        desired.insert(0x42, 50);

        let stats = chain.patch_in_place(&mut buf, &desired).unwrap();
        assert_eq!(stats.direct_skipped, vec![0]);
        assert_eq!(buf, before);
        assert_eq!(
            chain.residual(&buf, &desired).unwrap().into_iter().collect::<Vec<_>>(),
            vec![0x42]
        );
    }

    #[test]
    fn test_patch_respects_shadowing() {
        // 0x41 is resolved by the head Scan segment; the Table behind it must
        // not be touched for that code.
        let order = ByteOrder::Big;
        let mut buf = linked(
            order,
            false,
            vec![
                ((0x41, 0x41), 2, scan_body(order, &[(0x41, 5)])),
                ((0x41, 0x42), 1, table_body(order, &[6, 7])),
            ],
        );
        let chain = CmapChain::walk(&buf, 0, order, false).unwrap();
        let table_slot = chain.segments[1].body;
        let mut desired = chain.resolve(&buf).unwrap();
        desired.insert(0x41, 9);

        chain.patch_in_place(&mut buf, &desired).unwrap();
        assert_eq!(chain.resolve(&buf).unwrap()[&0x41], 9);
        assert_eq!(get_i16(&buf, table_slot, order).unwrap(), 6);
    }

    #[test]
    fn test_override_segment_layout() {
        let order = ByteOrder::Big;
        let pairs: BTreeMap<u32, u16> = [(0x41, 1), (0x0490, 140)].into_iter().collect();
        let seg = build_override_segment(&pairs, order, false).unwrap();
        assert_eq!(seg.len(), 20 + 2 + 2 * 4);
        assert_eq!(&seg[..4], b"CMAP");
        assert_eq!(&seg[4..8], &order.u32_bytes(30));

        let chain = CmapChain::walk(&seg, 0, order, false).unwrap();
        assert_eq!(chain.segments.len(), 1);
        assert_eq!(chain.segments[0].method, MappingMethod::Scan);
        assert_eq!(chain.segments[0].next, 0);
        assert_eq!(chain.resolve(&seg).unwrap(), pairs);
    }

    #[test]
    fn test_override_segment_layout_wide() {
        let order = ByteOrder::Little;
        let pairs: BTreeMap<u32, u16> = [(0x1F600, 3), (0x41, 1)].into_iter().collect();
        let seg = build_override_segment(&pairs, order, true).unwrap();
        assert_eq!(seg.len(), 24 + 4 + 2 * 8);
        let chain = CmapChain::walk(&seg, 0, order, true).unwrap();
        assert_eq!(chain.resolve(&seg).unwrap(), pairs);
    }

    #[test]
    fn test_override_segment_rejects_oversized_count() {
        let pairs: BTreeMap<u32, u16> = (0..=u16::MAX as u32).map(|code| (code, 1)).collect();
        assert_eq!(
            build_override_segment(&pairs, ByteOrder::Little, true),
            Err(FontError::TooManyPairs { count: 65536 })
        );

        let mut fits = pairs;
        fits.remove(&0);
        let seg = build_override_segment(&fits, ByteOrder::Little, true).unwrap();
        assert_eq!(&seg[24..26], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_mappable_drops_reserved_code() {
        let map: BTreeMap<u32, u16> = [(0xFFFF, 1), (0x41, 2)].into_iter().collect();
        assert_eq!(mappable(&map).into_iter().collect::<Vec<_>>(), vec![(0x41, 2)]);
    }
}
