//! GX2 2D macro-tiled addressing for 64-bit elements
//!
//! Each BC4 block is one 64-bit element. A block coordinate `(x, y)` (in
//! block units) maps to a byte offset inside the swizzled sheet through two
//! nested levels:
//!
//! - **Micro tile**: 8x8 elements, interleaved bit-by-bit from `x` and `y`
//! - **Macro tile**: 32x16 elements spread over pipes and banks, with a
//!   per-surface swizzle seed and a bank-swap correction per macro-tile column
//!
//! The same function serves both directions: swizzling writes block `(x, y)`
//! to `tile_addr(..)`, deswizzling reads it from there.

use crate::{BLOCK_BYTES, MACRO_TILE_HEIGHT, MACRO_TILE_PITCH};

/// Bytes in one macro tile (32 x 16 elements x 8 bytes)
const MACRO_TILE_BYTES: usize = MACRO_TILE_PITCH * MACRO_TILE_HEIGHT * BLOCK_BYTES;

/// Bank-swap permutation, indexed by macro-tile column group
const BANK_SWAP_ORDER: [usize; 8] = [0, 1, 3, 2, 6, 7, 5, 4];

// Bank-swap width bounds for 8-byte elements on a single-sample surface:
// swap width = 16 swap tiles * 32, max = 0x4000 / 16 height bytes,
// min = 256 / 64 bytes per tile slice.
const BANK_SWAP_WIDTH: usize = 512;
const BANK_SWAP_MAX: usize = 1024;
const BANK_SWAP_MIN: usize = 4;

/// Per-surface swizzle seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwizzleSeed {
    pub pipe: u32,
    pub bank: u32,
}

impl SwizzleSeed {
    /// Seed used for glyph sheet `index`: pipe 0, bank rotating through 0..4
    pub fn for_sheet(index: usize) -> Self {
        Self {
            pipe: 0,
            bank: (index & 3) as u32,
        }
    }

    /// Byte offset of block `(x, y)` in a sheet swizzled with this seed
    #[inline]
    pub fn addr(&self, x: usize, y: usize, pitch_blocks: usize, height_blocks: usize) -> usize {
        tile_addr(x, y, pitch_blocks, height_blocks, self.pipe, self.bank)
    }
}

/// Micro-tile element index for 64-bit elements
///
/// Bit layout (LSB first): `x0, y0, x1, x2, y1, y2`
#[inline]
pub(crate) fn micro_tile_index(x: usize, y: usize) -> usize {
    let x = x & 7;
    let y = y & 7;
    (x & 1)
        | ((y & 1) << 1)
        | (((x >> 1) & 1) << 2)
        | (((x >> 2) & 1) << 3)
        | (((y >> 1) & 1) << 4)
        | (((y >> 2) & 1) << 5)
}

#[inline]
fn pipe_from_xy(x: usize, y: usize) -> usize {
    ((y >> 3) ^ (x >> 3)) & 1
}

#[inline]
fn bank_from_xy(x: usize, y: usize) -> usize {
    (((y >> 5) ^ (x >> 3)) & 1) | (2 * (((y >> 4) ^ (x >> 4)) & 1))
}

/// Width (in elements) after which banks are swapped, for a given pitch
///
/// Returns 0 only for a zero pitch, which disables the swap.
pub(crate) fn bank_swapped_width(pitch_blocks: usize) -> usize {
    let mut width = BANK_SWAP_WIDTH.clamp(BANK_SWAP_MIN, BANK_SWAP_MAX);
    while width != 0 && width >= 2 * pitch_blocks {
        width >>= 1;
    }
    width
}

/// Swizzled byte offset of the block at `(x, y)`
///
/// # Arguments
/// * `x`, `y` - Block coordinates (pixels / 4)
/// * `pitch_blocks` - Sheet width in blocks
/// * `_height_blocks` - Sheet height in blocks (single-slice surfaces do not need it)
/// * `pipe_swizzle`, `bank_swizzle` - Surface swizzle seed
///
/// Offsets cover the sheet exactly once when the block grid is macro-tile
/// aligned (pitch a multiple of 32, height a multiple of 16).
pub fn tile_addr(
    x: usize,
    y: usize,
    pitch_blocks: usize,
    _height_blocks: usize,
    pipe_swizzle: u32,
    bank_swizzle: u32,
) -> usize {
    let element_offset = micro_tile_index(x, y) * BLOCK_BYTES;

    let pipe = pipe_from_xy(x, y);
    let bank = bank_from_xy(x, y);

    let swizzle = pipe_swizzle.wrapping_add(bank_swizzle.wrapping_mul(2)) as usize;
    let bank_pipe = ((pipe + 2 * bank) ^ (swizzle % 8)) % 8;
    let pipe = bank_pipe % 2;
    let mut bank = bank_pipe / 2;

    let macro_tiles_per_row = pitch_blocks / MACRO_TILE_PITCH;
    let macro_x = x / MACRO_TILE_PITCH;
    let macro_y = y / MACRO_TILE_HEIGHT;

    let swap_width = bank_swapped_width(pitch_blocks);
    if swap_width != 0 {
        let swap_index = (MACRO_TILE_PITCH * macro_x) / swap_width;
        bank ^= BANK_SWAP_ORDER[swap_index & 3];
    }

    let macro_tile_offset = (macro_x + macro_tiles_per_row * macro_y) * MACRO_TILE_BYTES;
    let total = (element_offset + (macro_tile_offset >> 3)) as u64;

    let addr = ((bank as u64) << 9)
        | ((pipe as u64) << 8)
        | (total & 255)
        | (((total & !255) << 3) & 0xFFFF_FFFF);
    addr as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_micro_tile_index_is_permutation() {
        let mut seen = HashSet::new();
        for y in 0..8 {
            for x in 0..8 {
                assert!(seen.insert(micro_tile_index(x, y)));
            }
        }
        assert_eq!(seen.len(), 64);
        assert!(seen.iter().all(|&i| i < 64));
    }

    #[test]
    fn test_micro_tile_index_bits() {
        assert_eq!(micro_tile_index(1, 0), 1);
        assert_eq!(micro_tile_index(0, 1), 2);
        assert_eq!(micro_tile_index(2, 0), 4);
        assert_eq!(micro_tile_index(4, 0), 8);
        assert_eq!(micro_tile_index(0, 2), 16);
        assert_eq!(micro_tile_index(0, 4), 32);
        // Only the low 3 bits of each coordinate matter
        assert_eq!(micro_tile_index(9, 10), micro_tile_index(1, 2));
    }

    #[test]
    fn test_bank_swapped_width() {
        assert_eq!(bank_swapped_width(32), 32);
        assert_eq!(bank_swapped_width(64), 64);
        assert_eq!(bank_swapped_width(128), 128);
        assert_eq!(bank_swapped_width(512), 512);
        assert_eq!(bank_swapped_width(4096), 512);
        assert_eq!(bank_swapped_width(0), 0);
    }

    #[test]
    fn test_known_addresses() {
        // Reference offsets for a 32x16 block sheet (128x64 pixels)
        assert_eq!(tile_addr(0, 0, 32, 16, 0, 0), 0);
        assert_eq!(tile_addr(1, 0, 32, 16, 0, 0), 8);
        assert_eq!(tile_addr(0, 1, 32, 16, 0, 0), 16);
        assert_eq!(tile_addr(7, 7, 32, 16, 0, 0), 2296);
        assert_eq!(tile_addr(8, 0, 32, 16, 0, 0), 768);
        assert_eq!(tile_addr(0, 8, 32, 16, 0, 0), 256);
        assert_eq!(tile_addr(5, 3, 32, 16, 0, 1), 728);
        assert_eq!(tile_addr(31, 15, 32, 16, 0, 3), 2296);
    }

    #[test]
    fn test_known_addresses_multi_macro_tile() {
        assert_eq!(tile_addr(40, 20, 64, 32, 0, 2), 15104);
        assert_eq!(tile_addr(33, 17, 64, 32, 0, 0), 13336);
        assert_eq!(tile_addr(100, 50, 128, 64, 0, 1), 62656);
    }

    #[test]
    fn test_seed_for_sheet() {
        assert_eq!(SwizzleSeed::for_sheet(0), SwizzleSeed { pipe: 0, bank: 0 });
        assert_eq!(SwizzleSeed::for_sheet(3), SwizzleSeed { pipe: 0, bank: 3 });
        assert_eq!(SwizzleSeed::for_sheet(5), SwizzleSeed { pipe: 0, bank: 1 });
        assert_eq!(
            SwizzleSeed::for_sheet(1).addr(5, 3, 32, 16),
            tile_addr(5, 3, 32, 16, 0, 1)
        );
    }

    /// Every block of an aligned grid lands on its own 8-byte slot, and the
    /// slots tile the sheet with no gaps.
    #[test]
    fn test_bijection_on_aligned_grids() {
        let grids = [(32, 16), (32, 32), (64, 16), (64, 32), (96, 32), (128, 64)];
        for &(pitch, height) in &grids {
            let sheet_bytes = pitch * height * BLOCK_BYTES;
            for bank in 0..4 {
                let mut seen = HashSet::with_capacity(pitch * height);
                for y in 0..height {
                    for x in 0..pitch {
                        let offset = tile_addr(x, y, pitch, height, 0, bank);
                        assert_eq!(offset % BLOCK_BYTES, 0, "unaligned at ({}, {})", x, y);
                        assert!(
                            offset + BLOCK_BYTES <= sheet_bytes,
                            "{}x{} bank {}: offset 0x{:X} out of range",
                            pitch,
                            height,
                            bank,
                            offset
                        );
                        assert!(seen.insert(offset), "collision at ({}, {})", x, y);
                    }
                }
                assert_eq!(seen.len(), pitch * height);
            }
        }
    }

    #[test]
    fn test_small_grid_escapes_sheet() {
        // A 16x16 block grid is smaller than one macro tile and cannot be
        // addressed inside its own 2048 bytes.
        let max = (0..16)
            .flat_map(|y| (0..16).map(move |x| tile_addr(x, y, 16, 16, 0, 0)))
            .max()
            .unwrap();
        assert!(max + BLOCK_BYTES > 16 * 16 * BLOCK_BYTES);
    }
}
