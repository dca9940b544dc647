//! Whole-sheet conversion between swizzled BC4 bytes and sample grids
//!
//! Row-major "linear" block order is `(y * width_blocks + x) * 8`; the
//! swizzled order is given by [`tile_addr`](crate::tile_addr).

use crate::bc4::{decode_block, encode_block};
use crate::tiling::SwizzleSeed;
use crate::{BLOCK_BYTES, BLOCK_DIM, BLOCK_SAMPLES, TexError};

/// Validate pixel dimensions and return the block grid size
fn block_grid(width: usize, height: usize) -> Result<(usize, usize), TexError> {
    if width % BLOCK_DIM != 0 || height % BLOCK_DIM != 0 {
        return Err(TexError::UnalignedDimensions { width, height });
    }
    Ok((width / BLOCK_DIM, height / BLOCK_DIM))
}

fn expect_len(actual: usize, expected: usize) -> Result<(), TexError> {
    if actual != expected {
        return Err(TexError::SizeMismatch { expected, actual });
    }
    Ok(())
}

/// Reorder swizzled blocks into row-major order
pub fn deswizzle_blocks(
    swizzled: &[u8],
    width_blocks: usize,
    height_blocks: usize,
    seed: SwizzleSeed,
) -> Result<Vec<u8>, TexError> {
    let size = width_blocks * height_blocks * BLOCK_BYTES;
    expect_len(swizzled.len(), size)?;

    let mut linear = vec![0u8; size];
    for y in 0..height_blocks {
        for x in 0..width_blocks {
            let src = seed.addr(x, y, width_blocks, height_blocks);
            if src + BLOCK_BYTES > size {
                return Err(TexError::AddressOutOfRange { x, y, offset: src });
            }
            let dst = (y * width_blocks + x) * BLOCK_BYTES;
            linear[dst..dst + BLOCK_BYTES].copy_from_slice(&swizzled[src..src + BLOCK_BYTES]);
        }
    }
    Ok(linear)
}

/// Reorder row-major blocks into swizzled order
pub fn swizzle_blocks(
    linear: &[u8],
    width_blocks: usize,
    height_blocks: usize,
    seed: SwizzleSeed,
) -> Result<Vec<u8>, TexError> {
    let size = width_blocks * height_blocks * BLOCK_BYTES;
    expect_len(linear.len(), size)?;

    let mut swizzled = vec![0u8; size];
    for y in 0..height_blocks {
        for x in 0..width_blocks {
            let dst = seed.addr(x, y, width_blocks, height_blocks);
            if dst + BLOCK_BYTES > size {
                return Err(TexError::AddressOutOfRange { x, y, offset: dst });
            }
            let src = (y * width_blocks + x) * BLOCK_BYTES;
            swizzled[dst..dst + BLOCK_BYTES].copy_from_slice(&linear[src..src + BLOCK_BYTES]);
        }
    }
    Ok(swizzled)
}

/// Decode a swizzled BC4 sheet into `width * height` samples (row-major)
pub fn decode_sheet(
    data: &[u8],
    width: usize,
    height: usize,
    seed: SwizzleSeed,
) -> Result<Vec<u8>, TexError> {
    let (bw, bh) = block_grid(width, height)?;
    let linear = deswizzle_blocks(data, bw, bh, seed)?;

    let mut samples = vec![0u8; width * height];
    for (i, chunk) in linear.chunks_exact(BLOCK_BYTES).enumerate() {
        let mut block = [0u8; BLOCK_BYTES];
        block.copy_from_slice(chunk);
        let values = decode_block(&block);
        let (bx, by) = (i % bw, i / bw);
        for py in 0..BLOCK_DIM {
            let row = (by * BLOCK_DIM + py) * width + bx * BLOCK_DIM;
            samples[row..row + BLOCK_DIM]
                .copy_from_slice(&values[py * BLOCK_DIM..(py + 1) * BLOCK_DIM]);
        }
    }
    Ok(samples)
}

/// Encode `width * height` samples (row-major) into a swizzled BC4 sheet
pub fn encode_sheet(
    samples: &[u8],
    width: usize,
    height: usize,
    seed: SwizzleSeed,
) -> Result<Vec<u8>, TexError> {
    let (bw, bh) = block_grid(width, height)?;
    expect_len(samples.len(), width * height)?;

    let mut linear = Vec::with_capacity(bw * bh * BLOCK_BYTES);
    for by in 0..bh {
        for bx in 0..bw {
            let mut values = [0u8; BLOCK_SAMPLES];
            for py in 0..BLOCK_DIM {
                let row = (by * BLOCK_DIM + py) * width + bx * BLOCK_DIM;
                values[py * BLOCK_DIM..(py + 1) * BLOCK_DIM]
                    .copy_from_slice(&samples[row..row + BLOCK_DIM]);
            }
            linear.extend_from_slice(&encode_block(&values));
        }
    }
    swizzle_blocks(&linear, bw, bh, seed)
}
