//! Bit-level unpacking primitives for PFOR-compressed blocks
//!
//! Two wire layouts share the same value semantics (little-endian byte
//! order, low-order bits first within each byte):
//!
//! - The scalar layout is a single bit stream: each value occupies the
//!   next `width` bits. Used for stream tails and exception arrays.
//! - The interleaved layout splits a 256-value block across eight
//!   parallel bit streams, refilled round-robin in 32-bit little-endian
//!   chunks. Consecutive outputs rotate through the lanes, so a
//!   vectorized decoder can keep all eight streams in registers. The
//!   scalar fallback below models the lanes as `u64` accumulators and is
//!   bit-identical to the vector form.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Number of values in a full interleaved block.
pub const BLOCK_SIZE: usize = 256;

/// Parallel bit streams in the interleaved layout.
const LANES: usize = 8;

#[inline]
fn low_bits(width: u8) -> u64 {
    (1u64 << width) - 1
}

/// Unpack `output.len()` values of `width` bits from the scalar layout.
/// Returns the number of input bytes consumed, always `⌈n·width/8⌉`.
///
/// `width == 0` writes zeros and reads nothing; `width == 32` degenerates
/// to plain little-endian word reads.
pub fn unpack(input: &[u8], output: &mut [u32], width: u8) -> Result<usize> {
    if width > 32 {
        return Err(Error::InvalidBitWidth(width));
    }
    if width == 0 {
        output.fill(0);
        return Ok(0);
    }
    let need = (output.len() * width as usize).div_ceil(8);
    if input.len() < need {
        return Err(Error::Truncated {
            need,
            have: input.len(),
        });
    }

    let mask = low_bits(width);
    let width = u32::from(width);
    let mut acc = 0u64;
    let mut bits = 0u32;
    let mut pos = 0usize;
    for out in output.iter_mut() {
        while bits < width {
            acc |= u64::from(input[pos]) << bits;
            pos += 1;
            bits += 8;
        }
        *out = (acc & mask) as u32;
        acc >>= width;
        bits -= width;
    }
    Ok(pos)
}

/// Unpack exactly [`BLOCK_SIZE`] values of `width` bits from the
/// interleaved layout. Returns the bytes consumed, always `32·width`.
pub fn unpack256(input: &[u8], output: &mut [u32], width: u8) -> Result<usize> {
    debug_assert_eq!(output.len(), BLOCK_SIZE);
    if width > 32 {
        return Err(Error::InvalidBitWidth(width));
    }
    if width == 0 {
        output.fill(0);
        return Ok(0);
    }
    let need = width as usize * 32;
    if input.len() < need {
        return Err(Error::Truncated {
            need,
            have: input.len(),
        });
    }

    let mask = low_bits(width);
    let width = u32::from(width);
    let mut acc = [0u64; LANES];
    let mut bits = 0u32;
    let mut pos = 0usize;
    let mut op = 0usize;
    while op < BLOCK_SIZE {
        if bits < width {
            // Refill every lane by one 32-bit little-endian word.
            for lane in acc.iter_mut() {
                *lane |= u64::from(LittleEndian::read_u32(&input[pos..])) << bits;
                pos += 4;
            }
            bits += 32;
        }
        // bits >= 32 >= width after a refill, so one 8-value group is
        // always available.
        for lane in acc.iter_mut() {
            output[op] = (*lane & mask) as u32;
            *lane >>= width;
            op += 1;
        }
        bits -= width;
    }
    Ok(pos)
}

/// [`unpack256`] fused with the exception merge of the bitmap block
/// shape: as each 8-value group is emitted, the matching `bitmap` byte
/// selects the lanes that receive the next exception, spliced in as
/// `exception << width`.
///
/// `bitmap` must hold at least 32 bytes (one per group, LSB = lane 0) and
/// `exceptions` at least as many values as the first 256 bitmap bits have
/// ones.
pub fn unpack256_patched(
    input: &[u8],
    output: &mut [u32],
    width: u8,
    exceptions: &[u32],
    bitmap: &[u8],
) -> Result<usize> {
    debug_assert_eq!(output.len(), BLOCK_SIZE);
    debug_assert!(bitmap.len() >= BLOCK_SIZE / 8);
    if width > 32 {
        return Err(Error::InvalidBitWidth(width));
    }
    let need = width as usize * 32;
    if input.len() < need {
        return Err(Error::Truncated {
            need,
            have: input.len(),
        });
    }

    let mask = low_bits(width);
    let mut acc = [0u64; LANES];
    let mut bits = 0u32;
    let mut pos = 0usize;
    let mut op = 0usize;
    let mut ex = 0usize;
    while op < BLOCK_SIZE {
        if bits < u32::from(width) {
            for lane in acc.iter_mut() {
                *lane |= u64::from(LittleEndian::read_u32(&input[pos..])) << bits;
                pos += 4;
            }
            bits += 32;
        }
        let group = bitmap[op / LANES];
        for (lane, lane_acc) in acc.iter_mut().enumerate() {
            let mut value = (*lane_acc & mask) as u32;
            if group & (1 << lane) != 0 {
                // Computed in u64 so width = 32 shifts cleanly to zero.
                value |= ((u64::from(exceptions[ex])) << width) as u32;
                ex += 1;
            }
            output[op] = value;
            *lane_acc >>= width;
            op += 1;
        }
        bits -= u32::from(width);
    }
    Ok(pos)
}
