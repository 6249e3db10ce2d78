//! Error types for decoding.

use thiserror::Error;

/// Errors produced while unpacking rocktree buffers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("varint starting at offset {offset} does not fit in 32 bits")]
    VarintOverflow { offset: usize },

    #[error("{field}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{field}: length {len} is not a multiple of {stride}")]
    Misaligned {
        field: &'static str,
        len: usize,
        stride: usize,
    },

    #[error("{field}: index {index} out of range (len {len})")]
    IndexOutOfRange {
        field: &'static str,
        index: usize,
        len: usize,
    },

    #[error("unsupported texture format {0}")]
    UnsupportedTextureFormat(i32),

    #[error("texture decode failed: {0}")]
    Texture(String),
}

/// Result alias for decoding functions.
pub type DecodeResult<T> = Result<T, DecodeError>;
