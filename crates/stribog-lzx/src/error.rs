//! Error types for LZX decompression.

use thiserror::Error;

/// Errors that can occur while decoding an LZX stream.
#[derive(Debug, Error)]
pub enum Error {
    /// Window size outside the supported 2^15..2^21 range.
    #[error("unsupported LZX window: {0} bits (supported range is 15..=21)")]
    InvalidWindow(u32),

    /// Block type field was not verbatim, aligned or uncompressed.
    #[error("invalid LZX block type {0}")]
    InvalidBlockType(u8),

    /// A Huffman tree over- or under-fills its code space, or a symbol
    /// was requested from a tree with no codes.
    #[error("invalid {tree} Huffman table")]
    InvalidHuffmanTable { tree: &'static str },

    /// An LZ77 match would run past the end of the window.
    #[error("match of {length} bytes at window position {position} overflows {window}-byte window")]
    MatchOverflowsWindow {
        position: usize,
        length: usize,
        window: usize,
    },

    /// The input ended before the requested output was produced.
    #[error("compressed stream truncated")]
    Truncated,

    /// A frame decoded to the wrong number of bytes.
    #[error("frame produced {actual} bytes, expected {expected}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    /// A match or block ran past the end of its declared block length.
    #[error("decoded data overruns the current block")]
    BlockOverrun,

    /// A block was still open when a decoder reset boundary was reached.
    #[error("block with {remaining} bytes remaining spans a reset boundary")]
    ResetMidBlock { remaining: usize },
}

/// Result type for LZX operations.
pub type Result<T> = std::result::Result<T, Error>;
