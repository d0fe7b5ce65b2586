//! PFOR block and stream decoding
//!
//! Every block starts with one header byte: the top two bits select the
//! block shape, the low six bits are the width of the bit-packed main
//! payload.
//!
//! | bit 7 | bit 6 | shape                                           |
//! |-------|-------|-------------------------------------------------|
//! | 0     | 0     | bit-packed payload only                         |
//! | 1     | 0     | bit-packed + bitmap-addressed packed exceptions |
//! | 0     | 1     | bit-packed + variable-byte exceptions           |
//! | 1     | 1     | one constant value repeated                     |
//!
//! A stream is a run of 256-value blocks in the interleaved layout,
//! followed by one scalar-layout tail block when the total count is not
//! a multiple of 256. Exceptions carry the high bits of values that do
//! not fit the block width; they are merged as `exception << width` into
//! the packed low bits. OR and ADD agree for that merge since the packed
//! field stays below `1 << width`; this decoder uses OR.

use byteorder::{ByteOrder, LittleEndian};

use crate::bitpacking::{self, BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::vbyte;

/// Readable bytes the caller must supply past the encoded stream. The
/// raw-copy and constant paths read up to one word beyond the bytes they
/// consume, and the interleaved refill reads 32 bytes at a time; the
/// padding keeps those reads inside the input slice.
pub const INPUT_PADDING: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Packed,
    PatchedBitmap,
    PatchedVb,
    Constant,
}

fn parse_header(header: u8) -> Result<(Shape, u8)> {
    let shape = match (header & 0x80 != 0, header & 0x40 != 0) {
        (false, false) => Shape::Packed,
        (true, false) => Shape::PatchedBitmap,
        (false, true) => Shape::PatchedVb,
        (true, true) => Shape::Constant,
    };
    let width = header & 0x3f;
    if width > 32 {
        return Err(Error::InvalidBitWidth(width));
    }
    Ok((shape, width))
}

/// Decode an entire stream: interleaved 256-value blocks while at least
/// 256 values remain, then one scalar tail block for the remainder.
/// Returns the total bytes consumed.
///
/// `input` must extend at least [`INPUT_PADDING`] bytes past the encoded
/// stream; `output.len()` must equal the encoded value count.
pub fn decode(input: &[u8], output: &mut [u32]) -> Result<usize> {
    let mut read = 0usize;
    let mut decoded = 0usize;
    while output.len() - decoded >= BLOCK_SIZE {
        read += decode_block256(&input[read..], &mut output[decoded..decoded + BLOCK_SIZE])?;
        decoded += BLOCK_SIZE;
    }
    if decoded < output.len() {
        read += decode_block(&input[read..], &mut output[decoded..])?;
    }
    Ok(read)
}

/// Decode one scalar-layout block of `output.len()` values,
/// `0 <= len < 256`. An empty output returns 0 without reading.
pub fn decode_block(input: &[u8], output: &mut [u32]) -> Result<usize> {
    debug_assert!(output.len() < BLOCK_SIZE);
    if output.is_empty() {
        return Ok(0);
    }
    let header = *input.first().ok_or(Error::Truncated { need: 1, have: 0 })?;
    let (shape, width) = parse_header(header)?;
    log::trace!("tail block: {:?} width={} len={}", shape, width, output.len());
    let read = match shape {
        Shape::Constant => decode_constant(&input[1..], output, width)?,
        Shape::Packed => bitpacking::unpack(&input[1..], output, width)?,
        Shape::PatchedVb => decode_patched_vb(&input[1..], output, width, false)?,
        Shape::PatchedBitmap => decode_patched_bitmap(&input[1..], output, width)?,
    };
    Ok(1 + read)
}

/// Decode one interleaved block of exactly [`BLOCK_SIZE`] values.
pub fn decode_block256(input: &[u8], output: &mut [u32]) -> Result<usize> {
    debug_assert_eq!(output.len(), BLOCK_SIZE);
    let header = *input.first().ok_or(Error::Truncated { need: 1, have: 0 })?;
    let (shape, width) = parse_header(header)?;
    log::trace!("block: {:?} width={}", shape, width);
    let read = match shape {
        Shape::Constant => decode_constant(&input[1..], output, width)?,
        Shape::Packed => bitpacking::unpack256(&input[1..], output, width)?,
        Shape::PatchedVb => decode_patched_vb(&input[1..], output, width, true)?,
        Shape::PatchedBitmap => decode_patched_bitmap256(&input[1..], output, width)?,
    };
    Ok(1 + read)
}

fn decode_constant(input: &[u8], output: &mut [u32], width: u8) -> Result<usize> {
    let len = (width as usize).div_ceil(8);
    let payload = input.get(..len).ok_or(Error::Truncated {
        need: len,
        have: input.len(),
    })?;
    let mut raw = [0u8; 4];
    raw[..len].copy_from_slice(payload);
    let mut value = LittleEndian::read_u32(&raw);
    if width < 32 {
        // width = 32 keeps every payload bit; `1 << 32` does not exist
        // in u32, so the mask only applies to narrower widths.
        value &= (1u32 << width) - 1;
    }
    output.fill(value);
    Ok(len)
}

/// Shared by both layouts: an exception-count byte, the packed main
/// payload, the exception values as a variable-byte run, then one index
/// byte per exception.
fn decode_patched_vb(
    input: &[u8],
    output: &mut [u32],
    width: u8,
    interleaved: bool,
) -> Result<usize> {
    let count = *input.first().ok_or(Error::Truncated { need: 1, have: 0 })? as usize;
    let mut pos = 1usize;
    pos += if interleaved {
        bitpacking::unpack256(&input[pos..], output, width)?
    } else {
        bitpacking::unpack(&input[pos..], output, width)?
    };

    let mut exceptions = [0u32; BLOCK_SIZE];
    pos += vbyte::decode(&input[pos..], &mut exceptions[..count])?;

    let indices = input.get(pos..pos + count).ok_or(Error::Truncated {
        need: pos + count,
        have: input.len(),
    })?;
    let len = output.len();
    for (&index, &exception) in indices.iter().zip(&exceptions[..count]) {
        let slot = output
            .get_mut(index as usize)
            .ok_or(Error::ExceptionIndex { index, len })?;
        *slot |= (u64::from(exception) << width) as u32;
    }
    Ok(pos + count)
}

/// Scalar-layout bitmap shape: an exception-width byte, a `⌈n/8⌉`-byte
/// presence bitmap, the packed exception values, then the packed main
/// payload. Exceptions merge in ascending bit position.
fn decode_patched_bitmap(input: &[u8], output: &mut [u32], width: u8) -> Result<usize> {
    let ex_width = *input.first().ok_or(Error::Truncated { need: 1, have: 0 })?;
    if ex_width > 32 {
        return Err(Error::InvalidBitWidth(ex_width));
    }
    let n = output.len();
    let bitmap_len = n.div_ceil(8);
    let mut pos = 1usize;
    let mut bitmap = [0u8; BLOCK_SIZE / 8];
    bitmap[..bitmap_len].copy_from_slice(input.get(pos..pos + bitmap_len).ok_or(
        Error::Truncated {
            need: pos + bitmap_len,
            have: input.len(),
        },
    )?);
    pos += bitmap_len;
    if n % 8 != 0 {
        // Bits at and beyond position n are not part of the block.
        bitmap[n / 8] &= (1u8 << (n % 8)) - 1;
    }
    let count: usize = bitmap.iter().map(|b| b.count_ones() as usize).sum();

    let mut exceptions = [0u32; BLOCK_SIZE];
    pos += bitpacking::unpack(&input[pos..], &mut exceptions[..count], ex_width)?;
    pos += bitpacking::unpack(&input[pos..], output, width)?;

    let mut ex = 0usize;
    for (byte_index, &byte) in bitmap[..bitmap_len].iter().enumerate() {
        let mut rest = byte;
        while rest != 0 {
            let position = byte_index * 8 + rest.trailing_zeros() as usize;
            output[position] |= (u64::from(exceptions[ex]) << width) as u32;
            ex += 1;
            rest &= rest - 1;
        }
    }
    Ok(pos)
}

/// Interleaved bitmap shape: fixed 32-byte bitmap, packed exception
/// values (scalar layout even inside an interleaved block), then the
/// main payload with the merge fused into the lane loop.
fn decode_patched_bitmap256(input: &[u8], output: &mut [u32], width: u8) -> Result<usize> {
    let ex_width = *input.first().ok_or(Error::Truncated { need: 1, have: 0 })?;
    if ex_width > 32 {
        return Err(Error::InvalidBitWidth(ex_width));
    }
    let mut pos = 1usize;
    let bitmap = input.get(pos..pos + BLOCK_SIZE / 8).ok_or(Error::Truncated {
        need: pos + BLOCK_SIZE / 8,
        have: input.len(),
    })?;
    let count: usize = bitmap
        .chunks_exact(8)
        .map(|word| LittleEndian::read_u64(word).count_ones() as usize)
        .sum();
    pos += BLOCK_SIZE / 8;

    let mut exceptions = [0u32; BLOCK_SIZE];
    pos += bitpacking::unpack(&input[pos..], &mut exceptions[..count], ex_width)?;
    pos += bitpacking::unpack256_patched(
        &input[pos..],
        output,
        width,
        &exceptions[..count],
        bitmap,
    )?;
    Ok(pos)
}
