//! BC4 single-channel block codec
//!
//! One block = 4x4 samples in 8 bytes: two endpoints followed by sixteen
//! 3-bit palette indices packed little-endian in row-major order.

use crate::{BLOCK_BYTES, BLOCK_SAMPLES};

/// Build the 8-entry palette for a pair of endpoints
///
/// - `a0 > a1`: endpoints plus 6 interpolated values
/// - otherwise: endpoints plus 4 interpolated values, then fixed 0 and 255
pub fn palette(a0: u8, a1: u8) -> [u8; 8] {
    let (e0, e1) = (a0 as u32, a1 as u32);
    let mut pal = [0u8; 8];
    pal[0] = a0;
    pal[1] = a1;

    if a0 > a1 {
        for i in 1..=6u32 {
            pal[1 + i as usize] = (((6 - i) * e0 + i * e1 + 3) / 7) as u8;
        }
    } else {
        for i in 1..=4u32 {
            pal[1 + i as usize] = (((4 - i) * e0 + i * e1 + 2) / 5) as u8;
        }
        pal[6] = 0;
        pal[7] = 255;
    }

    pal
}

/// Decode one block into 16 samples (row-major)
pub fn decode_block(block: &[u8; BLOCK_BYTES]) -> [u8; BLOCK_SAMPLES] {
    let pal = palette(block[0], block[1]);
    let bits = read_index_bits(block);

    let mut samples = [0u8; BLOCK_SAMPLES];
    for (i, sample) in samples.iter_mut().enumerate() {
        *sample = pal[((bits >> (3 * i)) & 0x7) as usize];
    }
    samples
}

/// Encode 16 samples (row-major) into one block
///
/// Naive min/max fit: `a0 = max`, `a1 = min`, each sample takes the nearest
/// palette entry (lowest index wins ties). A flat block encodes with all
/// indices zero. Only the 6-interpolant palette is ever produced.
pub fn encode_block(samples: &[u8; BLOCK_SAMPLES]) -> [u8; BLOCK_BYTES] {
    let a0 = samples.iter().copied().max().unwrap_or(0);
    let a1 = samples.iter().copied().min().unwrap_or(0);

    let mut block = [0u8; BLOCK_BYTES];
    block[0] = a0;
    block[1] = a1;
    if a0 == a1 {
        return block;
    }

    let pal = palette(a0, a1);
    let mut bits = 0u64;
    for (i, &sample) in samples.iter().enumerate() {
        bits |= (nearest_index(&pal, sample) as u64) << (3 * i);
    }
    block[2..].copy_from_slice(&bits.to_le_bytes()[..6]);
    block
}

#[inline]
fn read_index_bits(block: &[u8; BLOCK_BYTES]) -> u64 {
    let mut raw = [0u8; 8];
    raw[..6].copy_from_slice(&block[2..]);
    u64::from_le_bytes(raw)
}

#[inline]
fn nearest_index(pal: &[u8; 8], sample: u8) -> usize {
    let mut best = 0;
    let mut best_dist = u8::MAX as u32 + 1;
    for (i, &entry) in pal.iter().enumerate() {
        let dist = (sample as i32 - entry as i32).unsigned_abs();
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}
