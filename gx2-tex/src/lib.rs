//! GX2-Tex: texture sheet codec for BFFNT glyph sheets
//!
//! Font containers built for the Cafe GPU store their glyph sheets as BC4
//! blocks laid out in GX2 "2D macro-tiled" order. This crate converts between
//! that layout and plain row-major sample grids.
//!
//! **This is a pure codec** - it knows nothing about font containers. Sheet
//! geometry (width, height, sheet index) is supplied by the caller
//! (the `bffnt` crate's TGLP decoder).
//!
//! # Layers
//!
//! | Layer | Module | Unit |
//! |-------|--------|------|
//! | Tile addressing | [`tiling`] | one 8-byte block at `(x, y)` in block units |
//! | Block codec | [`bc4`] | one 4x4 block <-> 16 samples |
//! | Sheet codec | [`sheet`] | whole sheet bytes <-> `width * height` samples |
//!
//! # Block Format (BC4, 8 bytes)
//!
//! ```text
//! 0x00: endpoint a0 (u8)
//! 0x01: endpoint a1 (u8)
//! 0x02: 16 x 3-bit palette indices, little-endian, row-major
//! ```
//!
//! # Known asymmetry
//!
//! The encoder only ever produces the 6-interpolant palette (`a0 > a1`). The
//! decoder also understands the 4-interpolant palette with fixed 0/255 entries.
//! Re-encoding a decoded sheet is therefore lossy, and callers must only
//! re-encode sheets whose samples actually changed.
//!
//! # Usage
//!
//! ```
//! use gx2_tex::{decode_sheet, encode_sheet, SwizzleSeed};
//!
//! // 128x64 pixel sheet = 32x16 blocks = one macro tile
//! let samples = vec![0x80u8; 128 * 64];
//! let seed = SwizzleSeed::for_sheet(0);
//! let bytes = encode_sheet(&samples, 128, 64, seed).unwrap();
//! assert_eq!(bytes.len(), 32 * 16 * 8);
//!
//! let decoded = decode_sheet(&bytes, 128, 64, seed).unwrap();
//! assert_eq!(decoded, samples);
//! ```

pub mod bc4;
pub mod sheet;
pub mod tiling;

pub use bc4::{decode_block, encode_block};
pub use sheet::{decode_sheet, deswizzle_blocks, encode_sheet, swizzle_blocks};
pub use tiling::{SwizzleSeed, tile_addr};

// =============================================================================
// Constants
// =============================================================================

/// Width and height of one compressed block in pixels
pub const BLOCK_DIM: usize = 4;

/// Samples per compressed block (4x4)
pub const BLOCK_SAMPLES: usize = BLOCK_DIM * BLOCK_DIM;

/// Bytes per BC4 block
pub const BLOCK_BYTES: usize = 8;

/// Macro-tile width in blocks for 64-bit elements
pub const MACRO_TILE_PITCH: usize = 32;

/// Macro-tile height in blocks for 64-bit elements
pub const MACRO_TILE_HEIGHT: usize = 16;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur while converting a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexError {
    /// Sheet width or height is not a multiple of the 4-pixel block size
    UnalignedDimensions { width: usize, height: usize },
    /// Byte or sample buffer length does not match the sheet geometry
    SizeMismatch { expected: usize, actual: usize },
    /// Tile address for block `(x, y)` falls outside the sheet buffer
    AddressOutOfRange { x: usize, y: usize, offset: usize },
}

impl core::fmt::Display for TexError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TexError::UnalignedDimensions { width, height } => {
                write!(f, "sheet size {}x{} is not a multiple of 4", width, height)
            }
            TexError::SizeMismatch { expected, actual } => {
                write!(f, "sheet buffer is {} bytes, expected {}", actual, expected)
            }
            TexError::AddressOutOfRange { x, y, offset } => write!(
                f,
                "tile address 0x{:X} for block ({}, {}) is outside the sheet",
                offset, x, y
            ),
        }
    }
}

impl std::error::Error for TexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            TexError::UnalignedDimensions {
                width: 30,
                height: 32
            }
            .to_string(),
            "sheet size 30x32 is not a multiple of 4"
        );
        assert_eq!(
            TexError::SizeMismatch {
                expected: 4096,
                actual: 100
            }
            .to_string(),
            "sheet buffer is 100 bytes, expected 4096"
        );
    }

    #[test]
    fn test_macro_tile_bytes() {
        // One macro tile holds exactly 4096 bytes of 8-byte blocks
        assert_eq!(MACRO_TILE_PITCH * MACRO_TILE_HEIGHT * BLOCK_BYTES, 4096);
    }
}
