//! Decoder for TurboPFor-compressed 32-bit integer streams
//!
//! Implements the `P4ndec256v32` wire format used for posting lists in
//! trigram search indexes:
//! - 256-value blocks in an 8-lane interleaved bit-packed layout, with a
//!   scalar-layout tail block for the stream remainder
//! - Four block shapes: plain bit-packing, constant, and two patched
//!   (PFOR) shapes that carry oversized values out of band
//! - A five-range variable-byte code for exception values
//!
//! The decoder is a set of pure functions over caller-owned buffers: no
//! allocation caches, no global state, no I/O. Any number of threads may
//! decode independent buffers concurrently. Decoding is strictly
//! one-shot; malformed input surfaces as [`Error`], never as a partial
//! result.
//!
//! Input slices must extend at least [`INPUT_PADDING`] bytes past the
//! encoded stream — the format trades that slack for branch-free wide
//! reads. The output length must equal the value count the encoder
//! promised; it is not discoverable from the stream itself.
//!
//! ```rust
//! let mut input = vec![0xc8, 0x89]; // one constant block: 0x89
//! input.resize(2 + turbopfor::INPUT_PADDING, 0);
//!
//! let mut output = [0u32; 1];
//! let read = turbopfor::decode(&input, &mut output)?;
//! assert_eq!(read, 2);
//! assert_eq!(output, [0x89]);
//! # Ok::<(), turbopfor::Error>(())
//! ```

pub mod bitpacking;
pub mod error;
pub mod pfor;
pub mod vbyte;

pub use bitpacking::{unpack, unpack256, unpack256_patched, BLOCK_SIZE};
pub use error::{Error, Result};
pub use pfor::{decode, decode_block, decode_block256, INPUT_PADDING};
