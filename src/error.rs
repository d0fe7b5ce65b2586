//! Error types for the decoder

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("truncated input: need {need} bytes, {have} available")]
    Truncated { need: usize, have: usize },

    #[error("invalid bit width {0}, the packed formats carry at most 32 bits per value")]
    InvalidBitWidth(u8),

    #[error("exception index {index} out of range for a block of {len} values")]
    ExceptionIndex { index: u8, len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
