//! Error types for stribog-common.

use thiserror::Error;

/// Common error type for stribog operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// Invalid magic bytes encountered.
    #[error("invalid magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Text was not valid ASCII.
    #[error("non-ASCII byte {byte:#04x} at offset {offset}")]
    NotAscii { byte: u8, offset: usize },
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
